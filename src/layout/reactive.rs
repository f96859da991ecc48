//! Incremental re-layout for expanding and collapsing groups.
//!
//! The first pass over a diagram records every node's collapsed position in a
//! [`LayoutCache`]. Every later pass starts from those recorded positions and
//! pushes nodes down the flow axis by the room expanded groups need, so any
//! sequence of toggles ends in the same place as toggling straight to the
//! final set.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace};

use crate::config::LayoutConfig;
use crate::ir::Direction;

use super::groups::position_child_nodes;
use super::sizing::{group_bounds, size_for};
use super::types::{Point, StateNode};

/// Nodes whose collapsed flow centers differ by less than this share a rank.
const SAME_RANK_TOLERANCE: f32 = 0.5;

/// Per-diagram memory of the reactive pass.
#[derive(Debug, Clone, Default)]
pub struct LayoutCache {
    original_positions: HashMap<String, Point>,
    expanded_nodes: HashSet<String>,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets the baseline. Call when the definition or direction changes.
    pub fn reset(&mut self) {
        self.original_positions.clear();
        self.expanded_nodes.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.original_positions.is_empty()
    }

    pub fn original_position(&self, id: &str) -> Option<Point> {
        self.original_positions.get(id).copied()
    }

    /// The expansion set applied by the last pass.
    pub fn expanded_nodes(&self) -> &HashSet<String> {
        &self.expanded_nodes
    }

    fn record(&mut self, nodes: &[StateNode]) {
        for node in nodes.iter().filter(|n| !n.is_child()) {
            self.original_positions
                .entry(node.id.clone())
                .or_insert(node.position);
        }
    }
}

/// Extra flow-axis room an expanded group needs compared to its collapsed footprint.
pub fn expanded_space_needed(node: &StateNode, direction: Direction, config: &LayoutConfig) -> f32 {
    let bounds = node
        .group_bounds
        .unwrap_or_else(|| group_bounds(node.kind, &node.children, config));
    let collapsed = size_for(node.kind, config);
    (bounds.flow(direction) - collapsed.flow(direction) + config.group.expansion_padding).max(0.0)
}

/// Repositions `nodes` for the given expansion set.
///
/// Returns the input unchanged when `expanded_ids` equals the set applied by
/// the previous pass. Otherwise every top-level node moves to its recorded
/// collapsed position plus the room needed by expanded groups in earlier
/// ranks; cross coordinates never change. Expanded groups take their full
/// bounds and get their children placed inside; collapsed groups shrink back
/// to their fixed footprint.
pub fn calculate_reactive_layout(
    nodes: &[StateNode],
    expanded_ids: &HashSet<String>,
    cache: &mut LayoutCache,
    direction: Direction,
    config: &LayoutConfig,
) -> Vec<StateNode> {
    // Only ids the cache has not seen yet are recorded; known baselines stay put.
    cache.record(nodes);
    if *expanded_ids == cache.expanded_nodes {
        trace!("expansion set unchanged");
        return nodes.to_vec();
    }

    let mut result = nodes.to_vec();
    let collapsed_flow_center = |node: &StateNode, origin: Point| {
        let size = if node.is_group {
            size_for(node.kind, config)
        } else {
            node.size
        };
        origin.flow(direction) + size.flow(direction) * 0.5
    };

    let mut order: Vec<(usize, Point, f32)> = result
        .iter()
        .enumerate()
        .filter(|(_, node)| !node.is_child())
        .filter_map(|(idx, node)| {
            let origin = cache.original_position(&node.id)?;
            Some((idx, origin, collapsed_flow_center(node, origin)))
        })
        .collect();
    order.sort_by(|a, b| a.2.total_cmp(&b.2));

    let mut offset = 0.0_f32;
    let mut start = 0;
    while start < order.len() {
        let rank_center = order[start].2;
        let mut end = start;
        let mut rank_extra = 0.0_f32;
        while end < order.len() && order[end].2 - rank_center < SAME_RANK_TOLERANCE {
            let (idx, origin, _) = order[end];
            let node = &mut result[idx];
            node.position = Point::from_axes(
                origin.flow(direction) + offset,
                origin.cross(direction),
                direction,
            );
            if node.is_group && expanded_ids.contains(&node.id) {
                rank_extra = rank_extra.max(expanded_space_needed(node, direction, config));
            }
            end += 1;
        }
        offset += rank_extra;
        start = end;
    }

    let mut child_positions: HashMap<String, Point> = HashMap::new();
    for node in result.iter_mut().filter(|n| n.is_group && !n.is_child()) {
        if expanded_ids.contains(&node.id) {
            let bounds = node
                .group_bounds
                .unwrap_or_else(|| group_bounds(node.kind, &node.children, config));
            node.size = bounds;
            node.is_expanded = true;
        } else {
            node.size = size_for(node.kind, config);
            node.is_expanded = false;
        }
        // Children follow their group whether or not it is expanded.
        let origin = node.position;
        let kind = node.kind;
        position_child_nodes(origin, kind, &mut node.children, config.group.child_gap, config);
        for child in &node.children {
            child.walk(&mut |n: &StateNode| {
                child_positions.insert(n.id.clone(), n.position);
            });
        }
    }
    for node in result.iter_mut().filter(|n| n.is_child()) {
        if let Some(position) = child_positions.get(&node.id) {
            node.position = *position;
        }
    }

    debug!(
        expanded = expanded_ids.len(),
        total_offset = offset,
        "reactive layout applied"
    );
    cache.expanded_nodes = expanded_ids.clone();
    result
}

/// Everything a renderer should draw: top-level nodes plus the children of
/// expanded groups, each id exactly once.
pub fn visible_nodes(nodes: &[StateNode]) -> Vec<&StateNode> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out = Vec::new();
    for node in nodes.iter().filter(|n| !n.is_child()) {
        collect_visible(node, &mut seen, &mut out);
    }
    out
}

fn collect_visible<'a>(node: &'a StateNode, seen: &mut HashSet<&'a str>, out: &mut Vec<&'a StateNode>) {
    if !seen.insert(node.id.as_str()) {
        return;
    }
    out.push(node);
    if node.is_group && node.is_expanded {
        for child in &node.children {
            collect_visible(child, seen, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{AslDefinition, ChoiceRule, StateDefinition, StateType};
    use crate::layout::factory::build_graph;
    use crate::layout::hierarchical::layout_hierarchical;
    use crate::layout::types::{DiagramLayout, START_NODE_ID};

    fn pass(next: Option<&str>) -> StateDefinition {
        let mut state = StateDefinition::new(StateType::Pass);
        match next {
            Some(next) => state.next = Some(next.to_string()),
            None => state.end = true,
        }
        state
    }

    fn fan_out() -> AslDefinition {
        let mut fan = StateDefinition::new(StateType::Parallel);
        fan.branches = vec![
            AslDefinition::new("Left").with_state("Left", pass(None)),
            AslDefinition::new("Right").with_state("Right", pass(None)),
        ];
        fan.next = Some("After".to_string());
        AslDefinition::new("Before")
            .with_state("Before", pass(Some("Fan")))
            .with_state("Fan", fan)
            .with_state("After", pass(None))
    }

    fn base() -> (DiagramLayout, LayoutConfig) {
        let config = LayoutConfig::default();
        let (nodes, edges) = build_graph(&fan_out(), &config);
        let layout =
            layout_hierarchical(&nodes, &edges, START_NODE_ID, Direction::TopDown, &config).unwrap();
        (layout, config)
    }

    fn parallel(branches: &[&[&str]], next: Option<&str>) -> StateDefinition {
        let mut fan = StateDefinition::new(StateType::Parallel);
        fan.branches = branches
            .iter()
            .map(|names| {
                let mut scope = AslDefinition::new(names[0]);
                for (idx, name) in names.iter().enumerate() {
                    scope = scope.with_state(*name, pass(names.get(idx + 1).copied()));
                }
                scope
            })
            .collect();
        match next {
            Some(next) => fan.next = Some(next.to_string()),
            None => fan.end = true,
        }
        fan
    }

    fn layout_for(definition: &AslDefinition, direction: Direction) -> (DiagramLayout, LayoutConfig) {
        let config = LayoutConfig::default();
        let (nodes, edges) = build_graph(definition, &config);
        let layout = layout_hierarchical(&nodes, &edges, START_NODE_ID, direction, &config).unwrap();
        (layout, config)
    }

    fn by_id<'a>(nodes: &'a [StateNode], id: &str) -> &'a StateNode {
        nodes.iter().find(|n| n.id == id).unwrap()
    }

    fn set(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn unchanged_set_is_a_no_op() {
        let (layout, config) = base();
        let mut cache = LayoutCache::new();
        let first =
            calculate_reactive_layout(&layout.nodes, &set(&[]), &mut cache, Direction::TopDown, &config);
        assert_eq!(first, layout.nodes);
        assert!(!cache.is_empty());

        let expanded = set(&["Fan"]);
        let once =
            calculate_reactive_layout(&layout.nodes, &expanded, &mut cache, Direction::TopDown, &config);
        let twice = calculate_reactive_layout(&once, &expanded, &mut cache, Direction::TopDown, &config);
        assert_eq!(once, twice);
    }

    #[test]
    fn expansion_pushes_later_ranks_by_exact_amount() {
        let (layout, config) = base();
        let mut cache = LayoutCache::new();
        let expanded = set(&["Fan"]);
        let nodes =
            calculate_reactive_layout(&layout.nodes, &expanded, &mut cache, Direction::TopDown, &config);

        let fan = by_id(&nodes, "Fan");
        let needed = expanded_space_needed(fan, Direction::TopDown, &config);
        // 2 branches of 1 row: height 60 + 40, minus collapsed 60, plus 40.
        assert_eq!(needed, 80.0);
        assert!(fan.is_expanded);
        assert_eq!(fan.size, fan.group_bounds.unwrap());

        for id in ["Before", "Fan", START_NODE_ID] {
            assert_eq!(by_id(&nodes, id).position, by_id(&layout.nodes, id).position);
        }
        for id in ["After", "__end__"] {
            let before = by_id(&layout.nodes, id).position;
            let after = by_id(&nodes, id).position;
            assert_eq!(after.y, before.y + needed);
            assert_eq!(after.x, before.x);
        }

        let left = &fan.children[0];
        let right = &fan.children[1];
        assert_eq!(left.branch_index, Some(0));
        assert_eq!(right.branch_index, Some(1));
        assert!(right.position.x >= left.position.x + left.size.width);
    }

    #[test]
    fn collapsing_restores_the_baseline() {
        let (layout, config) = base();
        let mut cache = LayoutCache::new();
        let open = calculate_reactive_layout(
            &layout.nodes,
            &set(&["Fan"]),
            &mut cache,
            Direction::TopDown,
            &config,
        );
        let closed = calculate_reactive_layout(&open, &set(&[]), &mut cache, Direction::TopDown, &config);
        for node in &closed {
            let original = by_id(&layout.nodes, &node.id);
            assert_eq!(node.position, original.position);
            assert_eq!(node.size, original.size);
            assert!(!node.is_expanded);
        }
        assert_eq!(cache.original_position("After"), Some(by_id(&layout.nodes, "After").position));
    }

    #[test]
    fn flattened_children_update_in_place() {
        let (layout, config) = base();
        let mut flat = layout.nodes.clone();
        let child = by_id(&layout.nodes, "Fan").children[0].clone();
        flat.push(child);
        let mut cache = LayoutCache::new();
        let nodes =
            calculate_reactive_layout(&flat, &set(&["Fan"]), &mut cache, Direction::TopDown, &config);
        assert_eq!(nodes.len(), flat.len());
        let nested = &by_id(&nodes, "Fan").children[0];
        let listed = nodes.iter().filter(|n| n.id == nested.id).collect::<Vec<_>>();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].position, nested.position);

        let visible = visible_nodes(&nodes);
        let ids: HashSet<&str> = visible.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids.len(), visible.len());
        assert!(ids.contains("Fan_branch1_Right"));
    }

    #[test]
    fn collapsed_groups_hide_children() {
        let (layout, _) = base();
        let visible = visible_nodes(&layout.nodes);
        assert_eq!(visible.len(), layout.nodes.len());
        assert!(visible.iter().all(|n| !n.is_child()));
    }

    #[test]
    fn reset_clears_baseline() {
        let (layout, config) = base();
        let mut cache = LayoutCache::new();
        calculate_reactive_layout(&layout.nodes, &set(&["Fan"]), &mut cache, Direction::TopDown, &config);
        cache.reset();
        assert!(cache.is_empty());
        assert!(cache.expanded_nodes().is_empty());
    }

    #[test]
    fn later_collapsed_group_carries_its_children() {
        let definition = AslDefinition::new("A")
            .with_state("A", parallel(&[&["L1"], &["R1"]], Some("B")))
            .with_state("B", parallel(&[&["X1", "X2"]], None));
        let (layout, config) = layout_for(&definition, Direction::TopDown);
        let mut cache = LayoutCache::new();

        let nodes =
            calculate_reactive_layout(&layout.nodes, &set(&["A"]), &mut cache, Direction::TopDown, &config);
        let b = by_id(&nodes, "B");
        let shift = b.position.y - by_id(&layout.nodes, "B").position.y;
        assert!(shift > 0.0);
        assert!(!b.is_expanded);
        for (child, before) in b.children.iter().zip(&by_id(&layout.nodes, "B").children) {
            assert!(child.position.y >= b.position.y, "{}", child.id);
            assert_eq!(child.position.y, before.position.y + shift, "{}", child.id);
        }

        let both = calculate_reactive_layout(&nodes, &set(&["A", "B"]), &mut cache, Direction::TopDown, &config);
        let opened = by_id(&both, "B");
        assert_eq!(opened.position, b.position);
        for (child, collapsed) in opened.children.iter().zip(&b.children) {
            assert_eq!(child.position, collapsed.position, "{}", child.id);
        }
    }

    #[test]
    fn nested_group_children_are_positioned() {
        let mut outer = StateDefinition::new(StateType::Parallel);
        outer.branches = vec![AslDefinition::new("Inner").with_state("Inner", parallel(&[&["L"]], None))];
        outer.end = true;
        let definition = AslDefinition::new("O").with_state("O", outer);
        let (layout, config) = layout_for(&definition, Direction::TopDown);

        let check = |nodes: &[StateNode]| {
            let inner = &by_id(nodes, "O").children[0];
            let leaf = &inner.children[0];
            assert_eq!(leaf.id, "O_branch0_Inner_branch0_L");
            assert!(leaf.position.x >= inner.position.x);
            assert!(leaf.position.y >= inner.position.y);
        };
        check(&layout.nodes);

        let mut cache = LayoutCache::new();
        let open =
            calculate_reactive_layout(&layout.nodes, &set(&["O"]), &mut cache, Direction::TopDown, &config);
        check(&open);
    }

    #[test]
    fn same_rank_expansions_take_the_larger_room() {
        // Tall has one long branch, Wide has two short ones, so each wins on
        // a different axis.
        let mut pick = StateDefinition::new(StateType::Choice);
        pick.choices = ["Tall", "Wide"]
            .iter()
            .map(|target| ChoiceRule {
                variable: Some("$.kind".to_string()),
                string_equals: Some(target.to_string()),
                next: Some(target.to_string()),
                ..Default::default()
            })
            .collect();
        let definition = AslDefinition::new("Pick")
            .with_state("Pick", pick)
            .with_state("Tall", parallel(&[&["T1", "T2"]], Some("Join")))
            .with_state("Wide", parallel(&[&["W1"], &["W2"]], Some("Join")))
            .with_state("Join", pass(None));

        for direction in [Direction::TopDown, Direction::LeftRight] {
            let (layout, config) = layout_for(&definition, direction);
            let tall = by_id(&layout.nodes, "Tall");
            let wide = by_id(&layout.nodes, "Wide");
            assert_eq!(tall.position.flow(direction), wide.position.flow(direction));

            let mut cache = LayoutCache::new();
            let nodes = calculate_reactive_layout(
                &layout.nodes,
                &set(&["Tall", "Wide"]),
                &mut cache,
                direction,
                &config,
            );
            let needed_tall = expanded_space_needed(by_id(&nodes, "Tall"), direction, &config);
            let needed_wide = expanded_space_needed(by_id(&nodes, "Wide"), direction, &config);
            assert_ne!(needed_tall, needed_wide, "{direction:?}");

            for id in ["Join", "__end__"] {
                let before = by_id(&layout.nodes, id).position;
                let after = by_id(&nodes, id).position;
                assert_eq!(
                    after.flow(direction),
                    before.flow(direction) + needed_tall.max(needed_wide),
                    "{id} {direction:?}"
                );
                assert_eq!(after.cross(direction), before.cross(direction));
            }
        }
    }
}
