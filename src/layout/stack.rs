use crate::config::LayoutConfig;
use crate::ir::Direction;

use super::groups::position_child_nodes;
use super::types::{Connection, DiagramLayout, Point, StateNode};

/// Degraded layout: one top-level node per rank, in input order, centered on
/// a shared cross axis. Used only when the hierarchical pass fails.
pub fn layout_vertical_stack(
    nodes: &[StateNode],
    edges: &[Connection],
    direction: Direction,
    config: &LayoutConfig,
) -> DiagramLayout {
    let mut placed: Vec<StateNode> = nodes.iter().filter(|n| !n.is_child()).cloned().collect();
    let max_cross = placed
        .iter()
        .map(|n| n.size.cross(direction))
        .fold(0.0_f32, f32::max);

    let mut main_cursor = config.margin;
    for node in &mut placed {
        let cross = config.margin + (max_cross - node.size.cross(direction)) * 0.5;
        node.position = Point::from_axes(main_cursor, cross, direction);
        main_cursor += node.size.flow(direction) + config.spacing.base_rank_gap;

        if node.is_group {
            let origin = node.position;
            let kind = node.kind;
            position_child_nodes(origin, kind, &mut node.children, config.group.child_gap, config);
        }
    }

    let (width, height) = super::diagram_extent(&placed, config);
    DiagramLayout {
        nodes: placed,
        edges: edges.to_vec(),
        width,
        height,
    }
}
