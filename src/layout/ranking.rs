use std::collections::{HashMap, HashSet, VecDeque};

use super::types::Connection;

/// Edges whose endpoints are both in `node_ids`. Anything touching a child
/// node (or a state that does not exist) is left out of ranking.
pub(super) fn rank_edges<'a>(node_ids: &[String], edges: &'a [Connection]) -> Vec<&'a Connection> {
    let set: HashSet<&str> = node_ids.iter().map(String::as_str).collect();
    edges
        .iter()
        .filter(|edge| set.contains(edge.from.as_str()) && set.contains(edge.to.as_str()))
        .collect()
}

/// Buckets nodes by BFS depth from `start_id`.
///
/// Within a bucket nodes keep BFS discovery order. Nodes the search never
/// reaches are appended to the final bucket, in input order, so they still
/// render.
pub(super) fn compute_ranks(
    node_ids: &[String],
    edges: &[&Connection],
    start_id: &str,
) -> Vec<Vec<String>> {
    let mut adj: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in edges {
        adj.entry(edge.from.as_str()).or_default().push(edge.to.as_str());
    }

    let mut depth: HashMap<&str, usize> = HashMap::new();
    let mut rank_nodes: Vec<Vec<String>> = Vec::new();
    let mut queue: VecDeque<&str> = VecDeque::new();

    if node_ids.iter().any(|id| id == start_id) {
        depth.insert(start_id, 0);
        queue.push_back(start_id);
    }

    while let Some(id) = queue.pop_front() {
        let rank = depth.get(id).copied().unwrap_or(0);
        if rank_nodes.len() <= rank {
            rank_nodes.resize(rank + 1, Vec::new());
        }
        rank_nodes[rank].push(id.to_string());
        if let Some(nexts) = adj.get(id) {
            for next in nexts {
                if depth.contains_key(next) {
                    continue;
                }
                depth.insert(next, rank + 1);
                queue.push_back(next);
            }
        }
    }

    let unreached: Vec<String> = node_ids
        .iter()
        .filter(|id| !depth.contains_key(id.as_str()))
        .cloned()
        .collect();
    if !unreached.is_empty() {
        if rank_nodes.is_empty() {
            rank_nodes.push(Vec::new());
        }
        if let Some(last) = rank_nodes.last_mut() {
            last.extend(unreached);
        }
    }

    rank_nodes
}

/// Distinct predecessors of every node, in edge order.
pub(super) fn incoming_parents<'a>(edges: &[&'a Connection]) -> HashMap<&'a str, Vec<&'a str>> {
    let mut incoming: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in edges {
        let list = incoming.entry(edge.to.as_str()).or_default();
        if !list.contains(&edge.from.as_str()) {
            list.push(edge.from.as_str());
        }
    }
    incoming
}

/// For each gap between rank `r` and `r + 1`, whether a labeled edge crosses it.
pub(super) fn labeled_gaps(rank_nodes: &[Vec<String>], edges: &[&Connection]) -> Vec<bool> {
    let mut rank_of: HashMap<&str, usize> = HashMap::new();
    for (rank, bucket) in rank_nodes.iter().enumerate() {
        for id in bucket {
            rank_of.insert(id.as_str(), rank);
        }
    }
    let mut gaps = vec![false; rank_nodes.len()];
    for edge in edges {
        if !edge.has_label() {
            continue;
        }
        let (Some(&a), Some(&b)) = (rank_of.get(edge.from.as_str()), rank_of.get(edge.to.as_str()))
        else {
            continue;
        };
        let (lo, hi) = (a.min(b), a.max(b));
        if hi == lo + 1 {
            gaps[lo] = true;
        }
    }
    gaps
}
