mod factory;
mod groups;
mod hierarchical;
mod ranking;
mod reactive;
mod sizing;
mod stack;
pub(crate) mod types;

pub use factory::{
    build_graph, create_artificial_nodes, create_connections, create_group_node,
    create_state_node, format_condition,
};
pub use groups::{build_map_children, build_parallel_children, position_child_nodes};
pub use hierarchical::{improved_spacing, layout_hierarchical};
pub use reactive::{LayoutCache, calculate_reactive_layout, expanded_space_needed, visible_nodes};
pub use sizing::{group_bounds, size_for};
pub use stack::layout_vertical_stack;
pub use types::*;

use crate::config::LayoutConfig;
use crate::error::Result;
use crate::ir::AslDefinition;

/// Builds and lays out a definition in `config.direction`, all groups collapsed.
pub fn compute_layout(definition: &AslDefinition, config: &LayoutConfig) -> Result<DiagramLayout> {
    let (nodes, edges) = build_graph(definition, config);
    layout_hierarchical(&nodes, &edges, START_NODE_ID, config.direction, config)
}

/// Canvas size covering every visible node plus the margin, floored at the
/// configured minimum.
pub(crate) fn diagram_extent(nodes: &[StateNode], config: &LayoutConfig) -> (f32, f32) {
    let mut max_x: f32 = 0.0;
    let mut max_y: f32 = 0.0;
    for node in visible_nodes(nodes) {
        max_x = max_x.max(node.position.x + node.size.width);
        max_y = max_y.max(node.position.y + node.size.height);
    }
    (
        (max_x + config.margin).max(config.min_width),
        (max_y + config.margin).max(config.min_height),
    )
}
