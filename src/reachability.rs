use std::collections::{BTreeSet, VecDeque};

use crate::ir::AslDefinition;

/// Where a nested scope lives inside its owning state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeSlot {
    Branch(usize),
    Iterator,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NestedScope {
    /// Name of the Parallel or Map state that owns the scope.
    pub owner: String,
    pub slot: ScopeSlot,
    pub report: ScopeReachability,
}

/// Which states of one scope can be reached from its `StartAt`, plus the same
/// for every branch or iterator nested inside it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopeReachability {
    pub reachable: BTreeSet<String>,
    /// Unreached state names, in document order.
    pub unreachable: Vec<String>,
    pub nested: Vec<NestedScope>,
}

impl ScopeReachability {
    /// Slash-separated paths of every unreached state, this scope first.
    /// Branch scopes read as `Fan/branch1/Name`, iterators as `Each/iterator/Name`.
    pub fn unreachable_paths(&self) -> Vec<String> {
        let mut out = self.unreachable.clone();
        for scope in &self.nested {
            let segment = match scope.slot {
                ScopeSlot::Branch(idx) => format!("{}/branch{idx}", scope.owner),
                ScopeSlot::Iterator => format!("{}/iterator", scope.owner),
            };
            out.extend(
                scope
                    .report
                    .unreachable_paths()
                    .into_iter()
                    .map(|path| format!("{segment}/{path}")),
            );
        }
        out
    }
}

/// Walks every scope independently. Names only need to be unique inside
/// their own scope.
pub fn reachability(definition: &AslDefinition) -> ScopeReachability {
    let mut reachable = BTreeSet::new();
    let mut queue = VecDeque::new();
    if definition.states.contains_key(&definition.start_at) {
        reachable.insert(definition.start_at.clone());
        queue.push_back(definition.start_at.as_str());
    }

    while let Some(name) = queue.pop_front() {
        let Some(state) = definition.states.get(name) else {
            continue;
        };
        let targets = state
            .next
            .iter()
            .chain(state.choices.iter().filter_map(|rule| rule.next.as_ref()))
            .chain(state.default_next.iter())
            .chain(state.catch.iter().map(|catcher| &catcher.next));
        for target in targets {
            if definition.states.contains_key(target) && reachable.insert(target.clone()) {
                queue.push_back(target.as_str());
            }
        }
    }

    let unreachable = definition
        .states
        .keys()
        .filter(|name| !reachable.contains(*name))
        .cloned()
        .collect();

    let mut nested = Vec::new();
    for (name, state) in &definition.states {
        for (idx, branch) in state.branches.iter().enumerate() {
            nested.push(NestedScope {
                owner: name.clone(),
                slot: ScopeSlot::Branch(idx),
                report: reachability(branch),
            });
        }
        if let Some(body) = state.map_body() {
            nested.push(NestedScope {
                owner: name.clone(),
                slot: ScopeSlot::Iterator,
                report: reachability(body),
            });
        }
    }

    ScopeReachability {
        reachable,
        unreachable,
        nested,
    }
}
