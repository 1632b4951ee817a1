use std::collections::{HashMap, HashSet};

use crate::graph::{Graph, Node, NodeId};

/// Identity of one occurrence for expand/collapse purposes.
///
/// A node with several parents is keyed per parent so collapsing it under
/// one parent leaves its other occurrences alone. Single-parent nodes and
/// roots are keyed by id alone. Keys use issue ids, so they stay valid
/// across graph rebuilds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExpandKey {
    pub node: String,
    pub parent: Option<String>,
}

impl ExpandKey {
    pub fn for_occurrence(graph: &Graph, node: NodeId, parent: Option<NodeId>) -> Self {
        let n = graph.node(node);
        let parent = match parent {
            Some(p) if n.is_multi_parent() => Some(graph.node(p).id().to_string()),
            _ => None,
        };
        ExpandKey {
            node: n.id().to_string(),
            parent,
        }
    }
}

/// Expand/collapse state beyond each node's default flag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionState {
    /// Unfiltered per-instance overrides for multi-parent occurrences
    pub overrides: HashMap<ExpandKey, bool>,
    /// Collapsed by the user during the current filter session
    pub filter_collapsed: HashSet<ExpandKey>,
    /// Expanded by the user during the current filter session
    pub filter_forced_expanded: HashSet<ExpandKey>,
    /// Incremented each time a filter session ends
    pub session: u64,
}

impl ExpansionState {
    /// Effective expansion of one occurrence.
    ///
    /// `has_matching_descendant` is only consulted while filtered.
    pub fn is_expanded(
        &self,
        node: &Node,
        key: &ExpandKey,
        filtered: bool,
        has_matching_descendant: bool,
    ) -> bool {
        if filtered {
            if self.filter_collapsed.contains(key) {
                return false;
            }
            return self.filter_forced_expanded.contains(key) || has_matching_descendant;
        }
        self.overrides.get(key).copied().unwrap_or(node.expanded)
    }

    /// Record an explicit expand/collapse of one occurrence
    pub fn set(
        &mut self,
        graph: &mut Graph,
        node: NodeId,
        parent: Option<NodeId>,
        expanded: bool,
        filtered: bool,
    ) {
        let key = ExpandKey::for_occurrence(graph, node, parent);
        if filtered {
            if expanded {
                self.filter_collapsed.remove(&key);
                self.filter_forced_expanded.insert(key);
            } else {
                self.filter_forced_expanded.remove(&key);
                self.filter_collapsed.insert(key);
            }
        } else if key.parent.is_some() {
            self.overrides.insert(key, expanded);
        } else {
            self.overrides.remove(&key);
            graph.node_mut(node).expanded = expanded;
        }
    }

    /// Drop the filter-session maps once the filter is cleared
    pub fn end_filter_session(&mut self) {
        if self.filter_collapsed.is_empty() && self.filter_forced_expanded.is_empty() {
            return;
        }
        self.filter_collapsed.clear();
        self.filter_forced_expanded.clear();
        self.session += 1;
    }
}
