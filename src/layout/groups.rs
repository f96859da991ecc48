//! Child nodes of Parallel and Map groups.
//!
//! Every branch (or the Map iterator) is its own scope: state names are only
//! unique inside it, so child ids are namespaced under the parent id and edges
//! never leave their scope.

use std::collections::{HashMap, HashSet};

use crate::config::LayoutConfig;
use crate::ir::{AslDefinition, StateType};

use super::factory::{create_connections, create_group_node, create_state_node};
use super::types::{Connection, NodeKind, Point, StateNode};

pub fn build_parallel_children(
    parent_id: &str,
    branches: &[AslDefinition],
    config: &LayoutConfig,
) -> (Vec<StateNode>, Vec<Connection>) {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    for (idx, branch) in branches.iter().enumerate() {
        let prefix = format!("{parent_id}_branch{idx}");
        let (branch_nodes, branch_edges) = build_scope(parent_id, &prefix, branch, idx, config);
        nodes.extend(branch_nodes);
        edges.extend(branch_edges);
    }
    (nodes, edges)
}

pub fn build_map_children(
    parent_id: &str,
    iterator: &AslDefinition,
    config: &LayoutConfig,
) -> (Vec<StateNode>, Vec<Connection>) {
    let prefix = format!("{parent_id}_iterator");
    build_scope(parent_id, &prefix, iterator, 0, config)
}

fn build_scope(
    parent_id: &str,
    prefix: &str,
    scope: &AslDefinition,
    branch_index: usize,
    config: &LayoutConfig,
) -> (Vec<StateNode>, Vec<Connection>) {
    let local: HashSet<&str> = scope.states.keys().map(String::as_str).collect();
    let mut nodes = Vec::with_capacity(scope.states.len());
    let mut edges = Vec::new();
    let mut nested_edges = Vec::new();

    for (name, state) in &scope.states {
        let child_id = format!("{prefix}_{name}");
        let mut node = match state.state_type {
            StateType::Parallel => {
                let (children, inner) = build_parallel_children(&child_id, &state.branches, config);
                nested_edges.extend(inner);
                create_group_node(name, state, &scope.start_at, children, config)
            }
            StateType::Map => {
                let (children, inner) = match state.map_body() {
                    Some(body) => build_map_children(&child_id, body, config),
                    None => (Vec::new(), Vec::new()),
                };
                nested_edges.extend(inner);
                create_group_node(name, state, &scope.start_at, children, config)
            }
            _ => create_state_node(name, state, &scope.start_at, config),
        };
        node.id = child_id.clone();
        node.parent_id = Some(parent_id.to_string());
        node.branch_index = Some(branch_index);

        for mut edge in create_connections(&child_id, state) {
            if !local.contains(edge.to.as_str()) {
                continue;
            }
            edge.to = format!("{prefix}_{}", edge.to);
            edges.push(edge);
        }
        nodes.push(node);
    }

    edges.extend(nested_edges);
    (nodes, edges)
}

/// Places children inside their expanded parent, relative to `parent_position`.
///
/// Parallel branches become side-by-side columns; Map children form one
/// column. Each column is stacked top to bottom regardless of diagram direction.
/// Nested groups get their own children placed relative to themselves.
pub fn position_child_nodes(
    parent_position: Point,
    parent_kind: NodeKind,
    children: &mut [StateNode],
    spacing: f32,
    config: &LayoutConfig,
) {
    let group = &config.group;
    let inset = group.padding * 0.5;
    let mut rows: HashMap<usize, usize> = HashMap::new();

    for child in children.iter_mut() {
        let column = match parent_kind {
            NodeKind::Parallel => child.branch_index.unwrap_or(0),
            _ => 0,
        };
        let row = rows.entry(column).or_insert(0);
        let column_left =
            parent_position.x + inset + column as f32 * (group.branch_width + spacing);
        let row_top = parent_position.y + inset + *row as f32 * (group.row_height + spacing);
        child.position = Point::new(
            column_left + (group.branch_width - child.size.width) * 0.5,
            row_top + (group.row_height - child.size.height) * 0.5,
        );
        *row += 1;

        if child.is_group {
            let origin = child.position;
            let kind = child.kind;
            position_child_nodes(origin, kind, &mut child.children, spacing, config);
        }
    }
}
