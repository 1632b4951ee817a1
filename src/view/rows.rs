use crate::graph::{Graph, NodeId};
use crate::model::Status;

use super::expansion::{ExpandKey, ExpansionState};
use super::filter::{Filter, Matcher};

/// One visible occurrence of a node in the flattened outline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeRow {
    pub node: NodeId,
    /// The parent this occurrence is listed under (None for roots)
    pub parent: Option<NodeId>,
    pub depth: usize,
    pub has_children: bool,
    pub expanded: bool,
    pub multi_parent: bool,
    /// The node itself passes the active filter. False for ancestors kept
    /// as context and for children revealed by a forced expansion.
    pub matched: bool,
}

/// Display facts for one row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowFacts {
    pub depth: usize,
    pub status: Status,
    pub priority: u8,
    pub blocked: bool,
    pub has_in_progress: bool,
    pub has_ready: bool,
    pub has_children: bool,
    pub expanded: bool,
    pub multi_parent: bool,
}

pub fn row_facts(graph: &Graph, row: &TreeRow) -> RowFacts {
    let node = graph.node(row.node);
    RowFacts {
        depth: row.depth,
        status: node.status(),
        priority: node.issue.priority,
        blocked: node.is_blocked,
        has_in_progress: node.has_in_progress,
        has_ready: node.has_ready,
        has_children: row.has_children,
        expanded: row.expanded,
        multi_parent: row.multi_parent,
    }
}

/// Flatten the graph into visible rows.
///
/// Unfiltered, every root is shown and a node's children follow it when the
/// occurrence is expanded. With an active filter a node is shown when it
/// matches, when a descendant matches, or when its parent occurrence was
/// explicitly expanded during the filter session. A multi-parent node gets
/// one row under each visible parent.
pub fn recalc_visible_rows(graph: &Graph, filter: &Filter, expansion: &ExpansionState) -> Vec<TreeRow> {
    let filtered = filter.is_active();
    let mut walker = Walker {
        graph,
        expansion,
        filtered,
        matcher: filter.matcher(),
        memo: vec![None; graph.len()],
        rows: Vec::new(),
    };
    walker.walk(graph.roots());
    walker.rows
}

#[derive(Debug, Clone, Copy)]
struct Inclusion {
    matches: bool,
    descendant: bool,
}

/// An occurrence waiting to be visited
struct Pending {
    id: NodeId,
    parent: Option<NodeId>,
    depth: usize,
    revealed: bool,
}

struct Walker<'a> {
    graph: &'a Graph,
    expansion: &'a ExpansionState,
    filtered: bool,
    matcher: Matcher,
    memo: Vec<Option<Inclusion>>,
    rows: Vec<TreeRow>,
}

impl Walker<'_> {
    /// Whether `id` matches and whether any descendant does, computed once
    /// per node no matter how many parents reach it
    fn inclusion(&mut self, id: NodeId) -> Inclusion {
        if let Some(known) = self.memo[id.index()] {
            return known;
        }
        let graph = self.graph;
        // Post-order over the unmemoized part of the subtree
        let mut stack: Vec<(NodeId, usize)> = vec![(id, 0)];
        while let Some(top) = stack.last_mut() {
            let (current, next) = *top;
            let children = &graph.node(current).children;
            if let Some(&child) = children.get(next) {
                top.1 += 1;
                if self.memo[child.index()].is_none() {
                    stack.push((child, 0));
                }
                continue;
            }
            stack.pop();
            let descendant = children.iter().any(|c| {
                self.memo[c.index()].is_some_and(|inc| inc.matches || inc.descendant)
            });
            let matches = self.matcher.matches(graph.node(current));
            self.memo[current.index()] = Some(Inclusion { matches, descendant });
        }
        self.memo[id.index()].unwrap_or(Inclusion {
            matches: false,
            descendant: false,
        })
    }

    /// Pre-order over the roots, emitting a row per visible occurrence
    fn walk(&mut self, roots: &[NodeId]) {
        let graph = self.graph;
        let mut stack: Vec<Pending> = roots
            .iter()
            .rev()
            .map(|id| Pending {
                id: *id,
                parent: None,
                depth: 0,
                revealed: false,
            })
            .collect();

        while let Some(Pending {
            id,
            parent,
            depth,
            revealed,
        }) = stack.pop()
        {
            let node = graph.node(id);
            let inc = if self.filtered {
                self.inclusion(id)
            } else {
                Inclusion {
                    matches: true,
                    descendant: false,
                }
            };
            if self.filtered && !inc.matches && !inc.descendant && !revealed {
                continue;
            }

            let key = ExpandKey::for_occurrence(graph, id, parent);
            let expanded = node.has_children()
                && self
                    .expansion
                    .is_expanded(node, &key, self.filtered, inc.descendant);
            self.rows.push(TreeRow {
                node: id,
                parent,
                depth,
                has_children: node.has_children(),
                expanded,
                multi_parent: node.is_multi_parent(),
                matched: inc.matches,
            });

            if expanded {
                let reveal = self.filtered && self.expansion.filter_forced_expanded.contains(&key);
                stack.extend(node.children.iter().rev().map(|child| Pending {
                    id: *child,
                    parent: Some(id),
                    depth: depth + 1,
                    revealed: reveal,
                }));
            }
        }
    }
}
