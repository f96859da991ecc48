use crate::ir::Direction;
use crate::layout::{DiagramLayout, StateNode, visible_nodes};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Flat, renderer-independent view of a layout for regression diffs.
#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub direction: String,
    pub width: f32,
    pub height: f32,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub kind: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub parent: Option<String>,
    pub branch: Option<usize>,
    pub group: bool,
    pub expanded: bool,
    pub hidden: bool,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub from: String,
    pub to: String,
    pub kind: String,
    pub label: Option<String>,
    pub condition: Option<String>,
}

impl NodeDump {
    fn from_node(node: &StateNode, hidden: bool) -> Self {
        NodeDump {
            id: node.id.clone(),
            kind: format!("{:?}", node.kind),
            x: node.position.x,
            y: node.position.y,
            width: node.size.width,
            height: node.size.height,
            parent: node.parent_id.clone(),
            branch: node.branch_index,
            group: node.is_group,
            expanded: node.is_expanded,
            hidden,
        }
    }
}

impl LayoutDump {
    /// Every node including nested children; children of collapsed groups are
    /// marked hidden.
    pub fn from_layout(layout: &DiagramLayout, direction: Direction) -> Self {
        let shown: Vec<&str> = visible_nodes(&layout.nodes)
            .into_iter()
            .map(|node| node.id.as_str())
            .collect();

        let mut nodes = Vec::new();
        for top in layout.nodes.iter().filter(|n| !n.is_child()) {
            top.walk(&mut |node: &StateNode| {
                let hidden = !shown.contains(&node.id.as_str());
                nodes.push(NodeDump::from_node(node, hidden));
            });
        }

        let edges = layout
            .edges
            .iter()
            .map(|edge| EdgeDump {
                from: edge.from.clone(),
                to: edge.to.clone(),
                kind: format!("{:?}", edge.kind),
                label: edge.label.clone(),
                condition: edge.condition.clone(),
            })
            .collect();

        LayoutDump {
            direction: direction.as_token().to_string(),
            width: layout.width,
            height: layout.height,
            nodes,
            edges,
        }
    }
}

pub fn write_layout_dump(
    path: &Path,
    layout: &DiagramLayout,
    direction: Direction,
) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(layout, direction);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
