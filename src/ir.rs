use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "top-to-bottom")]
    TopDown,
    #[serde(rename = "left-to-right")]
    LeftRight,
}

impl Direction {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "top-to-bottom" | "TB" | "TD" => Some(Self::TopDown),
            "left-to-right" | "LR" => Some(Self::LeftRight),
            _ => None,
        }
    }

    pub fn as_token(self) -> &'static str {
        match self {
            Self::TopDown => "top-to-bottom",
            Self::LeftRight => "left-to-right",
        }
    }

    /// Ranks advance along x instead of y.
    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::LeftRight)
    }
}

/// The eight ASL state kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StateType {
    Task,
    #[default]
    Pass,
    Choice,
    Wait,
    Succeed,
    Fail,
    Parallel,
    Map,
}

impl StateType {
    pub fn is_group(self) -> bool {
        matches!(self, Self::Parallel | Self::Map)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeed | Self::Fail)
    }
}

/// A state machine: the root definition, a Parallel branch, or a Map iterator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AslDefinition {
    #[serde(default)]
    pub start_at: String,
    #[serde(default)]
    pub states: IndexMap<String, StateDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StateDefinition {
    /// A missing `Type` reads as `Pass`; rejecting it is the validator's job.
    #[serde(rename = "Type", default)]
    pub state_type: StateType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub end: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<ChoiceRule>,
    #[serde(rename = "Default", default, skip_serializing_if = "Option::is_none")]
    pub default_next: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub catch: Vec<Catcher>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub retry: Vec<Retrier>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<AslDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterator: Option<AslDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_processor: Option<AslDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StateDefinition {
    pub fn new(state_type: StateType) -> Self {
        Self {
            state_type,
            ..Default::default()
        }
    }

    /// The Map body, preferring `ItemProcessor` over the legacy `Iterator`.
    pub fn map_body(&self) -> Option<&AslDefinition> {
        self.item_processor.as_ref().or(self.iterator.as_ref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChoiceRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_equals: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_less_than: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_greater_than: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric_equals: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric_less_than: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric_greater_than: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boolean_equals: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Catcher {
    #[serde(default)]
    pub error_equals: Vec<String>,
    #[serde(default)]
    pub next: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_path: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Retrier {
    #[serde(default)]
    pub error_equals: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_seconds: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_rate: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AslDefinition {
    pub fn new(start_at: impl Into<String>) -> Self {
        Self {
            start_at: start_at.into(),
            ..Default::default()
        }
    }

    /// Builder-style insert, mostly for tests and benches.
    pub fn with_state(mut self, name: impl Into<String>, state: StateDefinition) -> Self {
        self.states.insert(name.into(), state);
        self
    }
}
