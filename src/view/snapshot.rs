use std::collections::{HashMap, HashSet};

use crate::graph::Graph;

use super::expansion::{ExpandKey, ExpansionState};
use super::filter::Filter;
use super::rows::{TreeRow, recalc_visible_rows};

/// Which pane receives navigation keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Focus {
    #[default]
    Tree,
    Detail,
}

/// Everything about the view that is not the graph itself
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub cursor: usize,
    pub scroll_offset: usize,
    pub filter: Filter,
    pub expansion: ExpansionState,
    pub focus: Focus,
}

/// View state keyed by issue id so it survives a graph rebuild
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub selected: Option<String>,
    pub selected_parent: Option<String>,
    pub cursor: usize,
    pub scroll_offset: usize,
    /// Ids whose default flag was expanded
    pub expanded: HashSet<String>,
    /// Every id in the captured graph. Nodes outside this set are new and
    /// keep the default expansion they were built with.
    pub known: HashSet<String>,
    pub overrides: HashMap<ExpandKey, bool>,
    pub filter_collapsed: HashSet<ExpandKey>,
    pub filter_forced_expanded: HashSet<ExpandKey>,
    pub filter: Filter,
    pub focus: Focus,
}

pub fn capture(graph: &Graph, rows: &[TreeRow], view: &ViewState) -> Snapshot {
    let selected = rows.get(view.cursor);
    let mut expanded = HashSet::new();
    let mut known = HashSet::with_capacity(graph.len());
    for (_, node) in graph.iter() {
        known.insert(node.id().to_string());
        if node.expanded {
            expanded.insert(node.id().to_string());
        }
    }
    Snapshot {
        selected: selected.map(|r| graph.node(r.node).id().to_string()),
        selected_parent: selected
            .and_then(|r| r.parent)
            .map(|p| graph.node(p).id().to_string()),
        cursor: view.cursor,
        scroll_offset: view.scroll_offset,
        expanded,
        known,
        overrides: view.expansion.overrides.clone(),
        filter_collapsed: view.expansion.filter_collapsed.clone(),
        filter_forced_expanded: view.expansion.filter_forced_expanded.clone(),
        filter: view.filter.clone(),
        focus: view.focus,
    }
}

/// Re-apply a snapshot to a (possibly new) graph and return the rows.
///
/// The cursor lands on the same occurrence when it still exists, else on
/// any occurrence of the same issue, else at the old index clamped to the
/// new row count.
pub fn restore(graph: &mut Graph, view: &mut ViewState, snapshot: &Snapshot) -> Vec<TreeRow> {
    for id in graph.ids().collect::<Vec<_>>() {
        let node = graph.node_mut(id);
        if snapshot.known.contains(node.id()) {
            node.expanded = snapshot.expanded.contains(node.id());
        }
    }

    view.filter = snapshot.filter.clone();
    view.focus = snapshot.focus;
    view.expansion.overrides = snapshot.overrides.clone();
    view.expansion.filter_collapsed = snapshot.filter_collapsed.clone();
    view.expansion.filter_forced_expanded = snapshot.filter_forced_expanded.clone();

    let rows = recalc_visible_rows(graph, &view.filter, &view.expansion);
    view.cursor = relocate(
        graph,
        &rows,
        snapshot.selected.as_deref(),
        snapshot.selected_parent.as_deref(),
        snapshot.cursor,
    );
    view.scroll_offset = snapshot.scroll_offset.min(rows.len().saturating_sub(1));
    rows
}

/// Find the row for `selected` under `parent`, falling back as described on
/// [`restore`]
pub fn relocate(
    graph: &Graph,
    rows: &[TreeRow],
    selected: Option<&str>,
    parent: Option<&str>,
    fallback: usize,
) -> usize {
    if rows.is_empty() {
        return 0;
    }
    if let Some(selected) = selected {
        let id_of = |r: &TreeRow| graph.node(r.node).id();
        let parent_of = |r: &TreeRow| r.parent.map(|p| graph.node(p).id());
        let exact = rows
            .iter()
            .position(|r| id_of(r) == selected && parent_of(r) == parent);
        if let Some(i) = exact.or_else(|| rows.iter().position(|r| id_of(r) == selected)) {
            return i;
        }
    }
    fallback.min(rows.len() - 1)
}
