//! Rank-based placement of the top-level graph.
//!
//! Ranks come from BFS depth, every rank is spread along the cross axis by a
//! barycenter pass, and ranks are stacked along the flow axis. The output is
//! a pure function of the input nodes, edges and direction.

use std::collections::HashMap;

use tracing::debug;

use crate::config::LayoutConfig;
use crate::error::{Error, Result};
use crate::ir::Direction;

use super::groups::position_child_nodes;
use super::ranking::{compute_ranks, incoming_parents, labeled_gaps, rank_edges};
use super::types::{Connection, ConnectionType, DiagramLayout, Point, StateNode};

/// Node gap and rank gap for a diagram, grown by how busy its edges are.
pub fn improved_spacing(
    nodes: &[StateNode],
    edges: &[Connection],
    config: &LayoutConfig,
) -> (f32, f32) {
    let spacing = &config.spacing;
    let mut node_gap = spacing.base_node_gap;
    let mut rank_gap = spacing.base_rank_gap;

    if edges.iter().any(Connection::has_label) {
        node_gap += spacing.labeled_node_increment;
        rank_gap += spacing.labeled_rank_increment;
    }
    let choice_edges = edges
        .iter()
        .filter(|edge| edge.kind == ConnectionType::Choice)
        .count();
    if choice_edges > 1 {
        node_gap += spacing.choice_node_increment;
        rank_gap += spacing.choice_rank_increment;
    }
    if edges.iter().any(|edge| edge.kind == ConnectionType::Error) {
        node_gap += spacing.error_node_increment;
        rank_gap += spacing.error_rank_increment;
    }
    if nodes.iter().any(|node| node.is_group) {
        node_gap += spacing.group_node_increment;
        rank_gap += spacing.group_rank_increment;
    }

    (
        node_gap.min(spacing.max_node_gap),
        rank_gap.min(spacing.max_rank_gap),
    )
}

/// Lays out every top-level node of `nodes`.
///
/// Child nodes passed at the top level are ignored; children living inside a
/// group are positioned inside the group's expanded box so that later
/// expansion has a sensible starting point. All edges are returned as given.
pub fn layout_hierarchical(
    nodes: &[StateNode],
    edges: &[Connection],
    start_id: &str,
    direction: Direction,
    config: &LayoutConfig,
) -> Result<DiagramLayout> {
    let mut placed: Vec<StateNode> = nodes.iter().filter(|n| !n.is_child()).cloned().collect();

    let mut index: HashMap<String, usize> = HashMap::with_capacity(placed.len());
    for (idx, node) in placed.iter().enumerate() {
        if index.insert(node.id.clone(), idx).is_some() {
            return Err(Error::DuplicateNodeId {
                id: node.id.clone(),
            });
        }
    }

    let node_ids: Vec<String> = placed.iter().map(|n| n.id.clone()).collect();
    let ranked_edges = rank_edges(&node_ids, edges);
    let ranks = compute_ranks(&node_ids, &ranked_edges, start_id);
    let parents = incoming_parents(&ranked_edges);
    let label_gaps = labeled_gaps(&ranks, &ranked_edges);
    let (node_gap, rank_gap) = improved_spacing(&placed, edges, config);
    debug!(
        nodes = placed.len(),
        ranks = ranks.len(),
        node_gap,
        rank_gap,
        "hierarchical layout"
    );

    let mut centers: HashMap<&str, f32> = HashMap::with_capacity(placed.len());
    let mut cursor = config.margin;

    for (rank, bucket) in ranks.iter().enumerate() {
        let members: Vec<usize> = bucket.iter().filter_map(|id| index.get(id).copied()).collect();
        if members.is_empty() {
            continue;
        }

        let desired: Vec<f32> = bucket
            .iter()
            .map(|id| {
                let placed_parents: Vec<f32> = parents
                    .get(id.as_str())
                    .map(|list| list.iter().filter_map(|p| centers.get(p).copied()).collect())
                    .unwrap_or_default();
                if placed_parents.is_empty() {
                    0.0
                } else {
                    placed_parents.iter().sum::<f32>() / placed_parents.len() as f32
                }
            })
            .collect();

        let mut order: Vec<usize> = (0..members.len()).collect();
        order.sort_by(|&a, &b| desired[a].total_cmp(&desired[b]));

        let mut rank_centers = vec![0.0_f32; members.len()];
        let mut prev: Option<(f32, f32)> = None;
        for &slot in &order {
            let half = placed[members[slot]].cross_half(direction);
            let center = match prev {
                Some((prev_center, prev_half)) => {
                    desired[slot].max(prev_center + prev_half + node_gap + half)
                }
                None => desired[slot],
            };
            rank_centers[slot] = center;
            prev = Some((center, half));
        }

        let deviation = rank_centers
            .iter()
            .zip(&desired)
            .map(|(center, want)| center - want)
            .sum::<f32>()
            / members.len() as f32;

        let max_flow = members
            .iter()
            .map(|&idx| placed[idx].size.flow(direction))
            .fold(0.0_f32, f32::max);

        for (slot, &idx) in members.iter().enumerate() {
            let center = rank_centers[slot] - deviation;
            let node = &mut placed[idx];
            let flow = cursor + (max_flow - node.size.flow(direction)) * 0.5;
            let cross = center - node.cross_half(direction);
            node.position = Point::from_axes(flow, cross, direction);
            centers.insert(bucket[slot].as_str(), center);
        }

        cursor += max_flow + rank_gap;
        if label_gaps.get(rank).copied().unwrap_or(false) {
            cursor += config.label_rank_gap;
        }
    }

    normalize_cross_axis(&mut placed, direction, config);
    for node in &mut placed {
        if !node.is_group {
            continue;
        }
        let origin = node.position;
        let kind = node.kind;
        position_child_nodes(origin, kind, &mut node.children, config.group.child_gap, config);
    }

    ensure_finite(&placed)?;
    let (width, height) = super::diagram_extent(&placed, config);
    Ok(DiagramLayout {
        nodes: placed,
        edges: edges.to_vec(),
        width,
        height,
    })
}

/// Shifts every node so the smallest cross coordinate sits on the margin.
fn normalize_cross_axis(nodes: &mut [StateNode], direction: Direction, config: &LayoutConfig) {
    let Some(min_cross) = nodes
        .iter()
        .map(|n| n.position.cross(direction))
        .reduce(f32::min)
    else {
        return;
    };
    let shift = config.margin - min_cross;
    for node in nodes.iter_mut() {
        let flow = node.position.flow(direction);
        let cross = node.position.cross(direction) + shift;
        node.position = Point::from_axes(flow, cross, direction);
    }
}

fn ensure_finite(nodes: &[StateNode]) -> Result<()> {
    for node in nodes {
        let mut bad = None;
        node.walk(&mut |n: &StateNode| {
            let finite = n.position.x.is_finite()
                && n.position.y.is_finite()
                && n.size.width.is_finite()
                && n.size.height.is_finite();
            if !finite && bad.is_none() {
                bad = Some(n.id.clone());
            }
        });
        if let Some(id) = bad {
            return Err(Error::NonFiniteCoordinate { id });
        }
    }
    Ok(())
}
