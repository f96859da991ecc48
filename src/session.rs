use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::config::LayoutConfig;
use crate::error::{Error, Result};
use crate::ir::{AslDefinition, Direction};
use crate::layout::{
    self, Connection, DiagramLayout, LayoutCache, START_NODE_ID, StateNode,
    calculate_reactive_layout,
};
use crate::reachability::reachability;

/// Node positions before and after an expansion change.
#[derive(Debug, Clone)]
pub struct Transition {
    pub from: Vec<StateNode>,
    pub to: Vec<StateNode>,
}

/// One rendered diagram: its definition, the collapsed base layout, the
/// current expansion set and the cache the reactive pass works from.
///
/// The cache is only ever reset through [`DiagramSession::set_direction`] and
/// [`DiagramSession::replace_definition`].
#[derive(Debug)]
pub struct DiagramSession {
    definition: AslDefinition,
    config: LayoutConfig,
    edges: Vec<Connection>,
    nodes: Vec<StateNode>,
    expanded: HashSet<String>,
    cache: LayoutCache,
}

impl DiagramSession {
    pub fn new(definition: AslDefinition, config: LayoutConfig) -> Self {
        let mut session = Self {
            definition,
            config,
            edges: Vec::new(),
            nodes: Vec::new(),
            expanded: HashSet::new(),
            cache: LayoutCache::new(),
        };
        session.rebuild();
        session
    }

    pub fn definition(&self) -> &AslDefinition {
        &self.definition
    }

    pub fn direction(&self) -> Direction {
        self.config.direction
    }

    pub fn nodes(&self) -> &[StateNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Connection] {
        &self.edges
    }

    pub fn expanded(&self) -> &HashSet<String> {
        &self.expanded
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    /// Current snapshot with its canvas size.
    pub fn layout(&self) -> DiagramLayout {
        let (width, height) = layout::diagram_extent(&self.nodes, &self.config);
        DiagramLayout {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            width,
            height,
        }
    }

    pub fn visible_nodes(&self) -> Vec<&StateNode> {
        layout::visible_nodes(&self.nodes)
    }

    pub fn toggle_group(&mut self, id: &str) -> Result<Transition> {
        self.ensure_group(id)?;
        let mut expanded = self.expanded.clone();
        if !expanded.remove(id) {
            expanded.insert(id.to_string());
        }
        Ok(self.apply(expanded))
    }

    pub fn expand(&mut self, id: &str) -> Result<Transition> {
        self.ensure_group(id)?;
        let mut expanded = self.expanded.clone();
        expanded.insert(id.to_string());
        Ok(self.apply(expanded))
    }

    pub fn collapse(&mut self, id: &str) -> Result<Transition> {
        self.ensure_group(id)?;
        let mut expanded = self.expanded.clone();
        expanded.remove(id);
        Ok(self.apply(expanded))
    }

    /// Re-lays the diagram in a new direction. Groups stay expanded.
    pub fn set_direction(&mut self, direction: Direction) -> Transition {
        let from = self.nodes.clone();
        if direction != self.config.direction {
            self.config.direction = direction;
            self.rebuild();
        }
        Transition {
            from,
            to: self.nodes.clone(),
        }
    }

    /// Swaps in a new definition. Expanded groups that no longer exist are dropped.
    pub fn replace_definition(&mut self, definition: AslDefinition) -> Transition {
        let from = self.nodes.clone();
        self.definition = definition;
        self.rebuild();
        Transition {
            from,
            to: self.nodes.clone(),
        }
    }

    fn ensure_group(&self, id: &str) -> Result<()> {
        let known = self
            .nodes
            .iter()
            .any(|node| node.is_group && !node.is_child() && node.id == id);
        if known {
            Ok(())
        } else {
            Err(Error::UnknownGroup { id: id.to_string() })
        }
    }

    fn apply(&mut self, expanded: HashSet<String>) -> Transition {
        let from = self.nodes.clone();
        self.nodes = calculate_reactive_layout(
            &self.nodes,
            &expanded,
            &mut self.cache,
            self.config.direction,
            &self.config,
        );
        self.expanded = expanded;
        debug!(expanded = self.expanded.len(), "expansion applied");
        Transition {
            from,
            to: self.nodes.clone(),
        }
    }

    fn rebuild(&mut self) {
        self.cache.reset();

        let report = reachability(&self.definition);
        for path in report.unreachable_paths() {
            warn!(state = %path, "state is not reachable from StartAt");
        }

        let (nodes, edges) = layout::build_graph(&self.definition, &self.config);
        let base = match layout::layout_hierarchical(
            &nodes,
            &edges,
            START_NODE_ID,
            self.config.direction,
            &self.config,
        ) {
            Ok(base) => base,
            Err(err) => {
                warn!(error = %err, "hierarchical layout failed, using vertical stack");
                layout::layout_vertical_stack(&nodes, &edges, self.config.direction, &self.config)
            }
        };
        info!(
            nodes = base.nodes.len(),
            edges = base.edges.len(),
            direction = self.config.direction.as_token(),
            "diagram laid out"
        );

        self.edges = base.edges;
        self.nodes = base.nodes;

        let groups: HashSet<&str> = self
            .nodes
            .iter()
            .filter(|node| node.is_group)
            .map(|node| node.id.as_str())
            .collect();
        let expanded: HashSet<String> = std::mem::take(&mut self.expanded)
            .into_iter()
            .filter(|id| groups.contains(id.as_str()))
            .collect();

        // Seed the cache with the collapsed baseline before expanding anything.
        self.nodes = calculate_reactive_layout(
            &self.nodes,
            &HashSet::new(),
            &mut self.cache,
            self.config.direction,
            &self.config,
        );
        if !expanded.is_empty() {
            self.apply(expanded);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{StateDefinition, StateType};

    fn pass(next: Option<&str>) -> StateDefinition {
        let mut state = StateDefinition::new(StateType::Pass);
        match next {
            Some(next) => state.next = Some(next.to_string()),
            None => state.end = true,
        }
        state
    }

    fn definition() -> AslDefinition {
        let mut each = StateDefinition::new(StateType::Map);
        each.iterator = Some(
            AslDefinition::new("Item")
                .with_state("Item", pass(Some("Save")))
                .with_state("Save", pass(None)),
        );
        each.next = Some("Done".to_string());
        AslDefinition::new("Each")
            .with_state("Each", each)
            .with_state("Done", pass(None))
    }

    #[test]
    fn toggling_twice_returns_to_start() {
        let mut session = DiagramSession::new(definition(), LayoutConfig::default());
        let base = session.nodes().to_vec();

        let open = session.toggle_group("Each").unwrap();
        assert_eq!(open.from, base);
        assert!(session.is_expanded("Each"));
        assert_eq!(session.visible_nodes().len(), base.len() + 2);

        let close = session.toggle_group("Each").unwrap();
        assert_eq!(close.from, open.to);
        assert_eq!(session.nodes(), base.as_slice());
    }

    #[test]
    fn unknown_groups_are_rejected() {
        let mut session = DiagramSession::new(definition(), LayoutConfig::default());
        assert!(matches!(
            session.expand("Done"),
            Err(Error::UnknownGroup { id }) if id == "Done"
        ));
        assert!(session.collapse("Nope").is_err());
    }

    #[test]
    fn direction_change_keeps_expansion() {
        let mut session = DiagramSession::new(definition(), LayoutConfig::default());
        session.expand("Each").unwrap();
        session.set_direction(Direction::LeftRight);
        assert_eq!(session.direction(), Direction::LeftRight);
        assert!(session.is_expanded("Each"));
        let each = session.nodes().iter().find(|n| n.id == "Each").unwrap();
        assert!(each.is_expanded);

        let done = session.nodes().iter().find(|n| n.id == "Done").unwrap();
        assert!(done.position.x > each.position.x + each.size.width);
    }

    #[test]
    fn replacing_definition_drops_stale_expansion() {
        let mut session = DiagramSession::new(definition(), LayoutConfig::default());
        session.expand("Each").unwrap();
        let simple = AslDefinition::new("Done").with_state("Done", pass(None));
        session.replace_definition(simple);
        assert!(session.expanded().is_empty());
        assert_eq!(session.nodes().len(), 3);
        assert!(session.layout().width >= 400.0);
    }
}
