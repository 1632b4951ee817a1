use serde::Serialize;

use crate::graph::Graph;
use crate::model::Status;
use crate::view::{Stats, TreeRow, ViewMode};

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct RowJson {
    pub id: String,
    pub title: String,
    pub status: Status,
    pub priority: u8,
    pub depth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub has_children: bool,
    pub expanded: bool,
    pub blocked: bool,
    pub multi_parent: bool,
    /// False for ancestors shown only as context for a match
    pub matched: bool,
}

#[derive(Serialize)]
pub struct TreeJson {
    pub mode: ViewMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    pub rows: Vec<RowJson>,
}

#[derive(Serialize)]
pub struct StatsJson {
    pub mode: ViewMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(flatten)]
    pub stats: Stats,
}

#[derive(Serialize)]
pub struct CheckJson {
    pub ok: bool,
    pub source: String,
    pub issues: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roots: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multi_parent: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

pub fn row_to_json(graph: &Graph, row: &TreeRow) -> RowJson {
    let node = graph.node(row.node);
    RowJson {
        id: node.id().to_string(),
        title: node.issue.title.clone(),
        status: node.status(),
        priority: node.issue.priority,
        depth: row.depth,
        parent: row.parent.map(|p| graph.node(p).id().to_string()),
        has_children: row.has_children,
        expanded: row.expanded,
        blocked: node.is_blocked,
        multi_parent: row.multi_parent,
        matched: row.matched,
    }
}

// ---------------------------------------------------------------------------
// Text formatting
// ---------------------------------------------------------------------------

/// One outline row as plain text: indent, expander, id, status, priority, title
pub fn format_row_line(graph: &Graph, row: &TreeRow) -> String {
    let node = graph.node(row.node);
    let expander = match (row.has_children, row.expanded) {
        (true, true) => '-',
        (true, false) => '+',
        (false, _) => ' ',
    };
    let mut line = format!(
        "{}{} {} [{}] P{} {}",
        "  ".repeat(row.depth),
        expander,
        node.id(),
        node.status(),
        node.issue.priority,
        node.issue.title
    );
    if node.is_blocked && !node.status().is_closed() {
        line.push_str(" (blocked)");
    }
    if row.multi_parent {
        line.push_str(&format!(" (under {} parents)", node.parents.len()));
    }
    line
}

pub fn format_stats(stats: &Stats) -> String {
    format!(
        "total: {}\nopen: {}\nin progress: {}\nclosed: {}\nready: {}\nblocked: {}",
        stats.total, stats.open, stats.in_progress, stats.closed, stats.ready, stats.blocked
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build;
    use crate::model::Issue;
    use crate::view::{ExpansionState, Filter, recalc_visible_rows};
    use pretty_assertions::assert_eq;

    fn rows(graph: &Graph) -> Vec<TreeRow> {
        recalc_visible_rows(graph, &Filter::default(), &ExpansionState::default())
    }

    #[test]
    fn formats_rows_with_indent_and_flags() {
        let mut graph = build(vec![
            Issue::new("bd-1", "Epic"),
            Issue::new("bd-2", "Other epic"),
            Issue::new("bd-3", "Shared")
                .child_of("bd-1")
                .child_of("bd-2")
                .blocked_by("bd-4"),
            Issue::new("bd-4", "Blocker").with_priority(3),
        ])
        .unwrap();
        graph.expand_all();
        let rows = rows(&graph);
        let text: Vec<String> = rows.iter().map(|r| format_row_line(&graph, r)).collect();
        assert_eq!(text[0], "- bd-1 [open] P2 Epic");
        assert_eq!(
            text[1],
            "    bd-3 [open] P2 Shared (blocked) (under 2 parents)"
        );
    }

    #[test]
    fn row_json_names_the_parent_occurrence() {
        let mut graph = build(vec![
            Issue::new("bd-1", "Epic"),
            Issue::new("bd-2", "Task").child_of("bd-1"),
        ])
        .unwrap();
        graph.expand_all();
        let rows = rows(&graph);
        let json = serde_json::to_value(row_to_json(&graph, &rows[1])).unwrap();
        assert_eq!(json["parent"], "bd-1");
        assert_eq!(json["status"], "open");
        assert_eq!(json["depth"], 1);
        let root = serde_json::to_value(row_to_json(&graph, &rows[0])).unwrap();
        assert!(root.get("parent").is_none());
    }

    #[test]
    fn stats_json_flattens_counts() {
        let json = serde_json::to_value(StatsJson {
            mode: ViewMode::Ready,
            filter: None,
            stats: Stats {
                total: 3,
                ready: 2,
                ..Stats::default()
            },
        })
        .unwrap();
        assert_eq!(json["mode"], "ready");
        assert_eq!(json["total"], 3);
        assert_eq!(json["ready"], 2);
    }
}
