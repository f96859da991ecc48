use serde_json::Value;

use crate::error::{Error, Result};
use crate::ir::AslDefinition;

/// Parse an ASL definition from JSON, falling back to JSON5 for hand-written
/// input with comments or trailing commas.
///
/// Definitions wrapped in a `Definition` (or `definition`) key are unwrapped.
pub fn parse_definition(input: &str) -> Result<AslDefinition> {
    let value = match serde_json::from_str::<Value>(input) {
        Ok(value) => value,
        Err(json_err) => match json5::from_str::<Value>(input) {
            Ok(value) => value,
            Err(_) => {
                return Err(Error::Parse {
                    message: json_err.to_string(),
                });
            }
        },
    };
    definition_from_value(value)
}

pub fn definition_from_value(value: Value) -> Result<AslDefinition> {
    let value = unwrap_definition(value);
    if !value.is_object() {
        return Err(Error::Parse {
            message: "definition must be a JSON object".to_string(),
        });
    }
    serde_json::from_value(value).map_err(|err| Error::Parse {
        message: err.to_string(),
    })
}

fn unwrap_definition(value: Value) -> Value {
    let Value::Object(mut map) = value else {
        return value;
    };
    if map.contains_key("States") {
        return Value::Object(map);
    }
    for key in ["Definition", "definition"] {
        if let Some(inner) = map.remove(key) {
            if inner.is_object() {
                return inner;
            }
            if let Some(text) = inner.as_str() {
                if let Ok(parsed) = serde_json::from_str::<Value>(text) {
                    return parsed;
                }
            }
            map.insert(key.to_string(), inner);
        }
    }
    Value::Object(map)
}
