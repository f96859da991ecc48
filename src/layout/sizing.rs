use std::collections::BTreeMap;

use crate::config::LayoutConfig;

use super::types::{NodeKind, Size, StateNode};

/// Fixed footprint per node kind. Content length never changes it.
pub fn size_for(kind: NodeKind, config: &LayoutConfig) -> Size {
    match kind {
        NodeKind::Choice | NodeKind::Parallel | NodeKind::Map => {
            Size::new(config.wide_state_width, config.state_height)
        }
        NodeKind::Task | NodeKind::Pass | NodeKind::Wait | NodeKind::Succeed | NodeKind::Fail => {
            Size::new(config.state_width, config.state_height)
        }
        NodeKind::Start | NodeKind::End => Size::new(config.boundary_size, config.boundary_size),
    }
}

/// Height of `count` rows stacked with `gap` between them.
fn stack_extent(count: usize, config: &LayoutConfig) -> f32 {
    if count == 0 {
        return 0.0;
    }
    let group = &config.group;
    count as f32 * group.row_height + (count - 1) as f32 * group.child_gap
}

/// Bounding box an expanded Parallel or Map needs for its children.
///
/// Parallel children form one column per `branch_index`; Map children form a
/// single column. Empty groups get the configured floor instead of a
/// degenerate box.
pub fn group_bounds(kind: NodeKind, children: &[StateNode], config: &LayoutConfig) -> Size {
    let group = &config.group;
    if children.is_empty() {
        return Size::new(group.empty_width, group.empty_height);
    }
    match kind {
        NodeKind::Parallel => {
            let mut per_branch: BTreeMap<usize, usize> = BTreeMap::new();
            for child in children {
                *per_branch.entry(child.branch_index.unwrap_or(0)).or_default() += 1;
            }
            let branch_count = per_branch.keys().next_back().map_or(1, |last| last + 1);
            let tallest = per_branch.values().copied().max().unwrap_or(0);
            let width = branch_count as f32 * group.branch_width
                + (branch_count - 1) as f32 * group.child_gap
                + group.padding;
            let height = stack_extent(tallest, config) + group.padding;
            Size::new(width, height)
        }
        NodeKind::Map => {
            let width = group.branch_width + group.padding;
            let height = stack_extent(children.len(), config) + group.padding;
            Size::new(width, height)
        }
        other => size_for(other, config),
    }
}
