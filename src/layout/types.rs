use serde::Serialize;

use crate::ir::{Direction, StateDefinition, StateType};

/// Reserved id of the synthetic entry node.
pub const START_NODE_ID: &str = "__start__";
/// Reserved id of the synthetic exit node.
pub const END_NODE_ID: &str = "__end__";

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Coordinate along the rank axis.
    pub fn flow(&self, direction: Direction) -> f32 {
        if direction.is_horizontal() { self.x } else { self.y }
    }

    /// Coordinate across the rank axis.
    pub fn cross(&self, direction: Direction) -> f32 {
        if direction.is_horizontal() { self.y } else { self.x }
    }

    pub fn from_axes(flow: f32, cross: f32, direction: Direction) -> Self {
        if direction.is_horizontal() {
            Self { x: flow, y: cross }
        } else {
            Self { x: cross, y: flow }
        }
    }

    pub fn lerp(self, to: Point, t: f32) -> Point {
        Point {
            x: self.x + (to.x - self.x) * t,
            y: self.y + (to.y - self.y) * t,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn flow(&self, direction: Direction) -> f32 {
        if direction.is_horizontal() { self.width } else { self.height }
    }

    pub fn cross(&self, direction: Direction) -> f32 {
        if direction.is_horizontal() { self.height } else { self.width }
    }
}

/// Visual kind of a node: one of the eight ASL state kinds or a synthetic boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeKind {
    Task,
    Pass,
    Choice,
    Wait,
    Succeed,
    Fail,
    Parallel,
    Map,
    Start,
    End,
}

impl From<StateType> for NodeKind {
    fn from(value: StateType) -> Self {
        match value {
            StateType::Task => Self::Task,
            StateType::Pass => Self::Pass,
            StateType::Choice => Self::Choice,
            StateType::Wait => Self::Wait,
            StateType::Succeed => Self::Succeed,
            StateType::Fail => Self::Fail,
            StateType::Parallel => Self::Parallel,
            StateType::Map => Self::Map,
        }
    }
}

impl NodeKind {
    pub fn is_boundary(self) -> bool {
        matches!(self, Self::Start | Self::End)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Source state, passed through untouched. `None` for boundary nodes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<StateDefinition>,
    pub position: Point,
    pub size: Size,
    pub is_start_state: bool,
    pub is_end_state: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_index: Option<usize>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_group: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_bounds: Option<Size>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<StateNode>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_expanded: bool,
}

impl StateNode {
    pub fn is_child(&self) -> bool {
        self.parent_id.is_some()
    }

    pub fn center(&self) -> Point {
        Point {
            x: self.position.x + self.size.width * 0.5,
            y: self.position.y + self.size.height * 0.5,
        }
    }

    pub(crate) fn cross_half(&self, direction: Direction) -> f32 {
        self.size.cross(direction) * 0.5
    }

    /// Depth-first walk over this node and all nested children.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a StateNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Next,
    Choice,
    Default,
    Error,
    Retry,
}

/// A directed arc between two node ids.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Connection {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: ConnectionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl Connection {
    pub fn new(from: impl Into<String>, to: impl Into<String>, kind: ConnectionType) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            kind,
            label: None,
            condition: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn has_label(&self) -> bool {
        self.label.as_deref().is_some_and(|label| !label.is_empty())
    }
}

/// Output contract handed to the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagramLayout {
    pub nodes: Vec<StateNode>,
    pub edges: Vec<Connection>,
    pub width: f32,
    pub height: f32,
}
