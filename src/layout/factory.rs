//! Turns ASL states into nodes and the edges they emit.
//!
//! The factory assumes a validated definition: fields it cannot form an edge
//! from are skipped, never reported.

use std::collections::HashSet;

use crate::config::LayoutConfig;
use crate::ir::{AslDefinition, ChoiceRule, StateDefinition, StateType};

use super::groups::{build_map_children, build_parallel_children};
use super::sizing::{group_bounds, size_for};
use super::types::{
    Connection, ConnectionType, END_NODE_ID, NodeKind, Point, START_NODE_ID, StateNode,
};

pub fn create_state_node(
    name: &str,
    state: &StateDefinition,
    start_at: &str,
    config: &LayoutConfig,
) -> StateNode {
    let kind = NodeKind::from(state.state_type);
    StateNode {
        id: name.to_string(),
        name: name.to_string(),
        kind,
        definition: Some(state.clone()),
        position: Point::default(),
        size: size_for(kind, config),
        is_start_state: name == start_at,
        is_end_state: state.end || state.state_type.is_terminal(),
        parent_id: None,
        branch_index: None,
        is_group: false,
        group_bounds: None,
        children: Vec::new(),
        is_expanded: false,
    }
}

pub fn create_group_node(
    name: &str,
    state: &StateDefinition,
    start_at: &str,
    children: Vec<StateNode>,
    config: &LayoutConfig,
) -> StateNode {
    let mut node = create_state_node(name, state, start_at, config);
    node.is_group = true;
    node.group_bounds = Some(group_bounds(node.kind, &children, config));
    node.is_expanded = false;
    node.children = children;
    node
}

/// The synthetic entry and exit nodes, in that order.
pub fn create_artificial_nodes(config: &LayoutConfig) -> [StateNode; 2] {
    let boundary = |id: &str, kind: NodeKind| StateNode {
        id: id.to_string(),
        name: match kind {
            NodeKind::Start => "Start".to_string(),
            _ => "End".to_string(),
        },
        kind,
        definition: None,
        position: Point::default(),
        size: size_for(kind, config),
        is_start_state: false,
        is_end_state: false,
        parent_id: None,
        branch_index: None,
        is_group: false,
        group_bounds: None,
        children: Vec::new(),
        is_expanded: false,
    };
    [
        boundary(START_NODE_ID, NodeKind::Start),
        boundary(END_NODE_ID, NodeKind::End),
    ]
}

/// Edges leaving one state: `Next`, one per choice rule, `Default`, one per catcher.
pub fn create_connections(name: &str, state: &StateDefinition) -> Vec<Connection> {
    let mut edges = Vec::new();

    if let Some(next) = state.next.as_deref() {
        edges.push(Connection::new(name, next, ConnectionType::Next));
    }

    for (idx, rule) in state.choices.iter().enumerate() {
        let Some(next) = rule.next.as_deref() else {
            continue;
        };
        edges.push(
            Connection::new(name, next, ConnectionType::Choice)
                .with_label(format!("Choice {}", idx + 1))
                .with_condition(format_condition(rule)),
        );
    }

    if let Some(default) = state.default_next.as_deref() {
        edges.push(Connection::new(name, default, ConnectionType::Default).with_label("Default"));
    }

    for (idx, catcher) in state.catch.iter().enumerate() {
        if catcher.next.is_empty() {
            continue;
        }
        edges.push(
            Connection::new(name, catcher.next.as_str(), ConnectionType::Error)
                .with_label(format!("Catch {}", idx + 1))
                .with_condition(catcher.error_equals.join(", ")),
        );
    }

    edges
}

/// Human-readable rendering of a choice rule.
///
/// Only the seven plain comparators are rendered; anything else (`And`, `Or`,
/// `Not`, timestamp and path comparators) reads as `condition`.
pub fn format_condition(rule: &ChoiceRule) -> String {
    let var = rule.variable.as_deref().unwrap_or("$");
    if let Some(value) = &rule.string_equals {
        return format!("{var} == \"{value}\"");
    }
    if let Some(value) = &rule.string_less_than {
        return format!("{var} < \"{value}\"");
    }
    if let Some(value) = &rule.string_greater_than {
        return format!("{var} > \"{value}\"");
    }
    if let Some(value) = &rule.numeric_equals {
        return format!("{var} == {value}");
    }
    if let Some(value) = &rule.numeric_less_than {
        return format!("{var} < {value}");
    }
    if let Some(value) = &rule.numeric_greater_than {
        return format!("{var} > {value}");
    }
    if let Some(value) = rule.boolean_equals {
        return format!("{var} == {value}");
    }
    "condition".to_string()
}

/// Builds the full node and edge sets for a definition: boundary nodes, one
/// node per state (groups carry their children), every emitted edge, the
/// start edge and one end edge per terminal state.
///
/// Top-level edges pointing at states that do not exist are dropped.
pub fn build_graph(
    definition: &AslDefinition,
    config: &LayoutConfig,
) -> (Vec<StateNode>, Vec<Connection>) {
    let [start, end] = create_artificial_nodes(config);
    let known: HashSet<&str> = definition.states.keys().map(String::as_str).collect();

    let mut nodes = Vec::with_capacity(definition.states.len() + 2);
    let mut edges = Vec::new();
    let mut child_edges = Vec::new();

    nodes.push(start);
    if known.contains(definition.start_at.as_str()) {
        edges.push(Connection::new(
            START_NODE_ID,
            definition.start_at.as_str(),
            ConnectionType::Next,
        ));
    }

    for (name, state) in &definition.states {
        let node = match state.state_type {
            StateType::Parallel => {
                let (children, inner) = build_parallel_children(name, &state.branches, config);
                child_edges.extend(inner);
                create_group_node(name, state, &definition.start_at, children, config)
            }
            StateType::Map => {
                let (children, inner) = match state.map_body() {
                    Some(body) => build_map_children(name, body, config),
                    None => (Vec::new(), Vec::new()),
                };
                child_edges.extend(inner);
                create_group_node(name, state, &definition.start_at, children, config)
            }
            _ => create_state_node(name, state, &definition.start_at, config),
        };

        edges.extend(
            create_connections(name, state)
                .into_iter()
                .filter(|edge| known.contains(edge.to.as_str())),
        );
        if node.is_end_state {
            edges.push(Connection::new(name.as_str(), END_NODE_ID, ConnectionType::Next));
        }
        nodes.push(node);
    }

    nodes.push(end);
    edges.extend(child_edges);
    (nodes, edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Catcher;
    use serde_json::Number;

    fn choice_state() -> StateDefinition {
        let mut state = StateDefinition::new(StateType::Choice);
        state.choices = vec![
            ChoiceRule {
                variable: Some("$.status".to_string()),
                string_equals: Some("ok".to_string()),
                next: Some("Done".to_string()),
                ..Default::default()
            },
            ChoiceRule {
                variable: Some("$.count".to_string()),
                numeric_less_than: Some(Number::from(5)),
                next: Some("Retry".to_string()),
                ..Default::default()
            },
        ];
        state.default_next = Some("Fallback".to_string());
        state
    }

    #[test]
    fn choice_fans_out_into_three_edges() {
        let edges = create_connections("Decide", &choice_state());
        let kinds: Vec<ConnectionType> = edges.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![ConnectionType::Choice, ConnectionType::Choice, ConnectionType::Default]
        );
        let labels: Vec<&str> = edges.iter().filter_map(|e| e.label.as_deref()).collect();
        assert_eq!(labels, vec!["Choice 1", "Choice 2", "Default"]);
        assert_eq!(edges[0].condition.as_deref(), Some("$.status == \"ok\""));
        assert_eq!(edges[1].condition.as_deref(), Some("$.count < 5"));
    }

    #[test]
    fn condition_uses_first_comparator_in_priority_order() {
        let rule = ChoiceRule {
            variable: Some("$.v".to_string()),
            numeric_greater_than: Some(Number::from(3)),
            boolean_equals: Some(true),
            ..Default::default()
        };
        assert_eq!(format_condition(&rule), "$.v > 3");

        let rule = ChoiceRule {
            variable: Some("$.flag".to_string()),
            boolean_equals: Some(false),
            ..Default::default()
        };
        assert_eq!(format_condition(&rule), "$.flag == false");
    }

    #[test]
    fn unsupported_operators_fall_back() {
        let mut rule = ChoiceRule::default();
        rule.extra.insert("And".to_string(), serde_json::json!([]));
        assert_eq!(format_condition(&rule), "condition");
    }

    #[test]
    fn catchers_become_error_edges() {
        let mut state = StateDefinition::new(StateType::Task);
        state.next = Some("B".to_string());
        state.catch = vec![Catcher {
            error_equals: vec!["States.Timeout".to_string(), "States.ALL".to_string()],
            next: "Handler".to_string(),
            ..Default::default()
        }];
        let edges = create_connections("A", &state);
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[1].kind, ConnectionType::Error);
        assert_eq!(edges[1].condition.as_deref(), Some("States.Timeout, States.ALL"));
        assert!(edges[1].has_label());
    }

    #[test]
    fn start_and_end_flags() {
        let config = LayoutConfig::default();
        let mut state = StateDefinition::new(StateType::Pass);
        state.end = true;
        let node = create_state_node("A", &state, "A", &config);
        assert!(node.is_start_state);
        assert!(node.is_end_state);

        let fail = create_state_node("F", &StateDefinition::new(StateType::Fail), "A", &config);
        assert!(!fail.is_start_state);
        assert!(fail.is_end_state);
    }

    #[test]
    fn build_graph_drops_dangling_edges() {
        let mut a = StateDefinition::new(StateType::Pass);
        a.next = Some("Missing".to_string());
        let definition = AslDefinition::new("A").with_state("A", a);
        let (nodes, edges) = build_graph(&definition, &LayoutConfig::default());
        assert_eq!(nodes.len(), 3);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].from, START_NODE_ID);
    }
}
