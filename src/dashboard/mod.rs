//! The live outline: one graph generation plus everything the user sees.
//!
//! [`Dashboard`] owns the graph, the materialized rows, the view state and
//! the notices. Every user action and every background result goes through
//! one of its methods; each method leaves `rows` consistent with the graph
//! and the view state.

pub mod inject;
pub mod refresh;

use std::collections::HashMap;
use std::time::{Instant, SystemTime};

use chrono::Utc;

use crate::graph::{Graph, Node};
use crate::io::comments::CommentResult;
use crate::io::fetch::{RefreshOutcome, RefreshTicket};
use crate::model::InjectConfig;
use crate::view::{
    self, Filter, Focus, RowFacts, Snapshot, Stats, TreeRow, ViewMode, ViewState,
    recalc_visible_rows,
};

pub use refresh::{Digest, Reconciler, RefreshRecord, Trigger};

/// Which slot a notice lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// The last background refresh failed
    Refresh,
    /// A user operation (inject, create) failed
    Operation,
    /// Something worked but not as well as it should have
    Warning,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    pub at: Instant,
}

/// Error and warning state shown in the status row.
///
/// Each kind has its own slot so a successful refresh can clear a stale
/// refresh error without hiding an unrelated operation error.
#[derive(Debug, Clone, Default)]
pub struct Notices {
    refresh: Option<Notice>,
    operation: Option<Notice>,
    warning: Option<Notice>,
}

impl Notices {
    fn slot(&mut self, kind: NoticeKind) -> &mut Option<Notice> {
        match kind {
            NoticeKind::Refresh => &mut self.refresh,
            NoticeKind::Operation => &mut self.operation,
            NoticeKind::Warning => &mut self.warning,
        }
    }

    pub fn set(&mut self, kind: NoticeKind, message: impl Into<String>) {
        *self.slot(kind) = Some(Notice {
            kind,
            message: message.into(),
            at: Instant::now(),
        });
    }

    pub fn clear(&mut self, kind: NoticeKind) {
        *self.slot(kind) = None;
    }

    pub fn get(&self, kind: NoticeKind) -> Option<&Notice> {
        match kind {
            NoticeKind::Refresh => self.refresh.as_ref(),
            NoticeKind::Operation => self.operation.as_ref(),
            NoticeKind::Warning => self.warning.as_ref(),
        }
    }

    /// The most recently raised notice
    pub fn latest(&self) -> Option<&Notice> {
        [&self.refresh, &self.operation, &self.warning]
            .into_iter()
            .flatten()
            .max_by_key(|n| n.at)
    }

    pub fn is_empty(&self) -> bool {
        self.refresh.is_none() && self.operation.is_none() && self.warning.is_none()
    }

    pub fn clear_all(&mut self) {
        *self = Notices::default();
    }
}

pub struct Dashboard {
    graph: Graph,
    rows: Vec<TreeRow>,
    view: ViewState,
    reconciler: Reconciler,
    notices: Notices,
    /// Issue shown in the detail pane, by id so it survives rebuilds
    detail: Option<String>,
    last_refresh: Option<RefreshRecord>,
    inject: InjectConfig,
}

impl Dashboard {
    /// Open a dashboard on an already-built graph.
    ///
    /// `observed` is the store mtime the graph was read at.
    pub fn new(graph: Graph, observed: Option<SystemTime>, inject: InjectConfig) -> Self {
        let reconciler = Reconciler::seeded(observed, graph.versions());
        let view = ViewState::default();
        let rows = recalc_visible_rows(&graph, &view.filter, &view.expansion);
        Dashboard {
            graph,
            rows,
            view,
            reconciler,
            notices: Notices::default(),
            detail: None,
            last_refresh: None,
            inject,
        }
    }

    // --- Read access ---

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn rows(&self) -> &[TreeRow] {
        &self.rows
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn cursor(&self) -> usize {
        self.view.cursor
    }

    pub fn filter(&self) -> &Filter {
        &self.view.filter
    }

    pub fn focus(&self) -> Focus {
        self.view.focus
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    pub fn last_refresh(&self) -> Option<&RefreshRecord> {
        self.last_refresh.as_ref()
    }

    pub fn refresh_in_flight(&self) -> bool {
        self.reconciler.in_flight()
    }

    pub fn selected_row(&self) -> Option<&TreeRow> {
        self.rows.get(self.view.cursor)
    }

    pub fn selected_node(&self) -> Option<&Node> {
        self.selected_row().map(|r| self.graph.node(r.node))
    }

    /// Issue id of the row at `index`
    pub fn row_id(&self, index: usize) -> Option<&str> {
        self.rows.get(index).map(|r| self.graph.node(r.node).id())
    }

    pub fn row_facts(&self, index: usize) -> Option<RowFacts> {
        self.rows.get(index).map(|r| view::row_facts(&self.graph, r))
    }

    pub fn stats(&self) -> Stats {
        view::stats::compute(&self.graph, &self.rows)
    }

    /// The node shown in the detail pane, if it still exists
    pub fn detail_node(&self) -> Option<&Node> {
        self.detail.as_deref().and_then(|id| self.graph.get(id))
    }

    // --- Capture / restore ---

    pub fn capture(&self) -> Snapshot {
        view::capture(&self.graph, &self.rows, &self.view)
    }

    pub fn restore(&mut self, snapshot: &Snapshot) {
        self.rows = view::restore(&mut self.graph, &mut self.view, snapshot);
    }

    /// Recompute rows after an in-place change, keeping the selected
    /// occurrence under the cursor
    fn recalc(&mut self) {
        let selected = self.selected_row().copied();
        let id = selected.map(|r| self.graph.node(r.node).id().to_string());
        let parent = selected
            .and_then(|r| r.parent)
            .map(|p| self.graph.node(p).id().to_string());
        self.rows = recalc_visible_rows(&self.graph, &self.view.filter, &self.view.expansion);
        self.view.cursor = view::relocate(
            &self.graph,
            &self.rows,
            id.as_deref(),
            parent.as_deref(),
            self.view.cursor,
        );
        self.clamp_scroll();
    }

    fn clamp_scroll(&mut self) {
        self.view.scroll_offset = self
            .view
            .scroll_offset
            .min(self.rows.len().saturating_sub(1));
    }

    // --- Filter ---

    pub fn set_filter_text(&mut self, text: &str) {
        let filter = Filter::new(text, self.view.filter.mode);
        self.apply_filter(filter);
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        let filter = Filter::new(self.view.filter.text.clone(), mode);
        self.apply_filter(filter);
    }

    pub fn cycle_view_mode(&mut self) {
        self.set_view_mode(self.view.filter.mode.next());
    }

    /// Drop the text filter and reset the view mode
    pub fn clear_filter(&mut self) {
        self.apply_filter(Filter::default());
    }

    fn apply_filter(&mut self, filter: Filter) {
        if filter == self.view.filter {
            return;
        }
        if !filter.is_active() {
            self.view.expansion.end_filter_session();
        }
        let mut snapshot = self.capture();
        snapshot.filter = filter;
        self.restore(&snapshot);
        tracing::debug!(
            text = %self.view.filter.text,
            mode = self.view.filter.mode.label(),
            rows = self.rows.len(),
            "filter applied"
        );
    }

    // --- Expansion ---

    /// Expand or collapse the occurrence at `index`.
    ///
    /// Under a filter a collapse is recorded even when the row already shows
    /// collapsed, so it still holds once a refresh gives the row a matching
    /// descendant.
    pub fn set_row_expanded(&mut self, index: usize, expanded: bool) {
        let Some(row) = self.rows.get(index).copied() else {
            return;
        };
        let filtered = self.view.filter.is_active();
        let sticky_collapse = filtered && !expanded;
        if !row.has_children || (row.expanded == expanded && !sticky_collapse) {
            return;
        }
        self.view
            .expansion
            .set(&mut self.graph, row.node, row.parent, expanded, filtered);
        self.recalc();
    }

    pub fn toggle_row(&mut self, index: usize) {
        if let Some(row) = self.rows.get(index) {
            let expanded = !row.expanded;
            self.set_row_expanded(index, expanded);
        }
    }

    pub fn toggle_selected(&mut self) {
        self.toggle_row(self.view.cursor);
    }

    pub fn expand_selected(&mut self) {
        self.set_row_expanded(self.view.cursor, true);
    }

    /// Collapse the selected row, or move to its parent row when there is
    /// nothing to collapse
    pub fn collapse_selected(&mut self) {
        let Some(row) = self.selected_row().copied() else {
            return;
        };
        if row.expanded {
            self.set_row_expanded(self.view.cursor, false);
            return;
        }
        if row.has_children && self.view.filter.is_active() {
            self.set_row_expanded(self.view.cursor, false);
        }
        if let Some(parent) = row.parent {
            let above = self.rows[..self.view.cursor]
                .iter()
                .rposition(|r| r.node == parent && r.depth + 1 == row.depth);
            if let Some(i) = above {
                self.view.cursor = i;
            }
        }
    }

    /// Expand every node with children (unfiltered defaults)
    pub fn expand_all(&mut self) {
        self.graph.expand_all();
        self.view.expansion.overrides.clear();
        self.recalc();
    }

    // --- Navigation ---

    pub fn move_cursor(&mut self, delta: isize) {
        if self.rows.is_empty() {
            self.view.cursor = 0;
            return;
        }
        let last = self.rows.len() - 1;
        let next = self.view.cursor.saturating_add_signed(delta);
        self.view.cursor = next.min(last);
    }

    pub fn select(&mut self, index: usize) {
        self.view.cursor = index.min(self.rows.len().saturating_sub(1));
    }

    pub fn select_first(&mut self) {
        self.view.cursor = 0;
    }

    pub fn select_last(&mut self) {
        self.view.cursor = self.rows.len().saturating_sub(1);
    }

    /// Select the first occurrence of `issue_id`. False if it is not visible.
    pub fn select_id(&mut self, issue_id: &str) -> bool {
        match self.rows.iter().position(|r| self.graph.node(r.node).id() == issue_id) {
            Some(i) => {
                self.view.cursor = i;
                true
            }
            None => false,
        }
    }

    /// Adjust the scroll offset so the cursor is inside a window of
    /// `height` rows
    pub fn scroll_to_cursor(&mut self, height: usize) {
        if height == 0 {
            return;
        }
        let cursor = self.view.cursor;
        if cursor < self.view.scroll_offset {
            self.view.scroll_offset = cursor;
        } else if cursor >= self.view.scroll_offset + height {
            self.view.scroll_offset = cursor + 1 - height;
        }
        self.clamp_scroll();
    }

    pub fn set_focus(&mut self, focus: Focus) {
        self.view.focus = focus;
    }

    pub fn toggle_focus(&mut self) {
        self.view.focus = match self.view.focus {
            Focus::Tree if self.detail_node().is_some() => Focus::Detail,
            _ => Focus::Tree,
        };
    }

    /// Show the selected issue in the detail pane
    pub fn open_detail(&mut self) {
        self.detail = self.selected_node().map(|n| n.id().to_string());
    }

    pub fn close_detail(&mut self) {
        self.detail = None;
        self.view.focus = Focus::Tree;
    }

    // --- Refresh ---

    /// Ask for a full refresh on the next check
    pub fn force_refresh(&mut self) {
        self.reconciler.force();
    }

    /// Issue a refresh ticket if one is due.
    ///
    /// `mtime` is the current store modification time.
    pub fn check_for_changes(
        &mut self,
        mtime: Option<SystemTime>,
        now: Instant,
    ) -> Option<RefreshTicket> {
        let (ticket, trigger) = self.reconciler.check(mtime, now)?;
        tracing::info!(generation = ticket.generation, ?trigger, "refresh scheduled");
        Some(ticket)
    }

    /// Apply a finished background refresh.
    ///
    /// On success the new graph replaces the old one and the view is carried
    /// over by issue id. On failure the current graph stays as it is.
    pub fn apply_refresh(&mut self, outcome: RefreshOutcome) {
        if !self.reconciler.finish(&outcome.ticket) {
            tracing::warn!(generation = outcome.ticket.generation, "stale refresh ignored");
            return;
        }
        let mut graph = match outcome.result {
            Ok(graph) => graph,
            Err(err) => {
                tracing::warn!(%err, "keeping previous graph");
                self.notices.set(NoticeKind::Refresh, err.to_string());
                return;
            }
        };

        let versions = graph.versions();
        let digest = Digest::between(self.reconciler.versions(), &versions);
        carry_comments(&self.graph, &mut graph, self.reconciler.versions(), &versions);

        let snapshot = self.capture();
        self.graph = graph;
        self.restore(&snapshot);

        if self.detail.is_some() && self.detail_node().is_none() {
            self.close_detail();
        }

        self.reconciler.record_success(&outcome.ticket, versions);
        self.notices.clear(NoticeKind::Refresh);
        tracing::info!(
            generation = outcome.ticket.generation,
            added = digest.added.len(),
            changed = digest.changed.len(),
            removed = digest.removed.len(),
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "refresh applied"
        );
        self.last_refresh = Some(RefreshRecord {
            at: Utc::now(),
            digest,
            elapsed: outcome.elapsed,
        });
    }

    // --- Comments ---

    /// Visible issues whose comments have not been loaded or attempted
    pub fn wanted_comments(&self) -> Vec<String> {
        let mut seen = vec![false; self.graph.len()];
        let mut out = Vec::new();
        for row in &self.rows {
            if std::mem::replace(&mut seen[row.node.index()], true) {
                continue;
            }
            let node = self.graph.node(row.node);
            if !node.comments_loaded && node.comment_error.is_none() {
                out.push(node.id().to_string());
            }
        }
        out
    }

    /// Attach loaded comments (or the failure) to the node by id
    pub fn apply_comments(&mut self, loaded: CommentResult) {
        let Some(id) = self.graph.lookup(&loaded.issue_id) else {
            tracing::debug!(issue = %loaded.issue_id, "comments for vanished issue dropped");
            return;
        };
        let node = self.graph.node_mut(id);
        match loaded.result {
            Ok(comments) => {
                node.comments = comments;
                node.comments_loaded = true;
                node.comment_error = None;
            }
            Err(err) => {
                node.comment_error = Some(err.to_string());
            }
        }
    }

    // --- Notices ---

    pub fn notify(&mut self, kind: NoticeKind, message: impl Into<String>) {
        self.notices.set(kind, message);
    }

    /// Clear every notice. False if there was nothing to dismiss.
    pub fn dismiss_notices(&mut self) -> bool {
        if self.notices.is_empty() {
            return false;
        }
        self.notices.clear_all();
        true
    }
}

/// Keep already-loaded comments for issues whose version did not change
fn carry_comments(
    old: &Graph,
    new: &mut Graph,
    old_versions: &HashMap<String, String>,
    new_versions: &HashMap<String, String>,
) {
    for (_, prev) in old.iter() {
        if !prev.comments_loaded {
            continue;
        }
        let id = prev.id();
        if old_versions.get(id) != new_versions.get(id) {
            continue;
        }
        if let Some(handle) = new.lookup(id) {
            let node = new.node_mut(handle);
            node.comments = prev.comments.clone();
            node.comments_loaded = true;
        }
    }
}

/// Row index of the occurrence of `issue_id` listed under `parent_id`
pub fn find_row(dashboard: &Dashboard, issue_id: &str, parent_id: Option<&str>) -> Option<usize> {
    let graph = dashboard.graph();
    dashboard.rows().iter().position(|r| {
        graph.node(r.node).id() == issue_id
            && r.parent.map(|p| graph.node(p).id()) == parent_id
    })
}
