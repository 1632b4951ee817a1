use std::collections::HashSet;

use serde::Serialize;

use crate::graph::Graph;
use crate::model::Status;

use super::rows::TreeRow;

/// Status counts over the visible outline.
///
/// A node shown under several parents is counted once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total: usize,
    pub open: usize,
    pub in_progress: usize,
    pub closed: usize,
    pub ready: usize,
    pub blocked: usize,
}

pub fn compute(graph: &Graph, rows: &[TreeRow]) -> Stats {
    let mut seen = HashSet::new();
    let mut stats = Stats::default();
    for row in rows {
        if !seen.insert(row.node) {
            continue;
        }
        let node = graph.node(row.node);
        stats.total += 1;
        match node.status() {
            Status::Open => stats.open += 1,
            Status::InProgress => stats.in_progress += 1,
            Status::Closed => stats.closed += 1,
        }
        if node.is_ready() {
            stats.ready += 1;
        }
        if node.is_blocked && !node.status().is_closed() {
            stats.blocked += 1;
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build;
    use crate::model::Issue;
    use crate::view::{ExpansionState, Filter, recalc_visible_rows};

    #[test]
    fn shared_nodes_count_once() {
        let mut graph = build(vec![
            Issue::new("e1", "E1"),
            Issue::new("e2", "E2").with_status(Status::InProgress),
            Issue::new("t", "T").child_of("e1").child_of("e2").blocked_by("x"),
            Issue::new("x", "X").with_status(Status::Closed),
        ])
        .unwrap();
        graph.expand_all();
        let rows = recalc_visible_rows(&graph, &Filter::default(), &ExpansionState::default());
        assert_eq!(rows.len(), 5);

        let stats = compute(&graph, &rows);
        assert_eq!(
            stats,
            Stats {
                total: 4,
                open: 2,
                in_progress: 1,
                closed: 1,
                ready: 2,
                blocked: 0,
            }
        );
    }

    #[test]
    fn open_blockers_mark_work_blocked() {
        let graph = build(vec![
            Issue::new("a", "A"),
            Issue::new("b", "B").blocked_by("a"),
        ])
        .unwrap();
        let rows = recalc_visible_rows(&graph, &Filter::default(), &ExpansionState::default());
        let stats = compute(&graph, &rows);
        assert_eq!(stats.blocked, 1);
        assert_eq!(stats.ready, 1);
    }
}
