use std::time::Instant;

use crate::graph::{self, InjectError, NodeId};
use crate::model::{Issue, Status};

use super::{Dashboard, NoticeKind};

impl Dashboard {
    /// Insert a freshly created issue without waiting for a full refresh.
    ///
    /// On success the cursor moves to the new row (when it is visible) and a
    /// full reconciliation is scheduled. On failure an operation notice is
    /// raised and a full refresh is forced instead.
    pub fn inject(
        &mut self,
        issue: Issue,
        parent_hint: Option<&str>,
    ) -> Result<NodeId, InjectError> {
        let started = Instant::now();
        let in_progress = issue.status == Status::InProgress;
        let issue_id = issue.id.clone();

        let id = match graph::insert(&mut self.graph, issue, parent_hint) {
            Ok(id) => id,
            Err(err) => {
                tracing::warn!(issue = %issue_id, %err, "fast-path insert failed, forcing refresh");
                self.notices.set(NoticeKind::Operation, err.to_string());
                self.reconciler.force();
                return Err(err);
            }
        };

        if in_progress && let Some(parent) = self.graph.node(id).parent {
            self.expand_occurrences(parent);
        }
        self.recalc();
        self.select_id(&issue_id);

        let elapsed = started.elapsed();
        let budget = self.inject.budget();
        if elapsed > budget {
            tracing::warn!(
                issue = %issue_id,
                elapsed_us = elapsed.as_micros() as u64,
                budget_ms = budget.as_millis() as u64,
                "fast-path insert over budget"
            );
            self.notices.set(
                NoticeKind::Warning,
                format!(
                    "inserting {} took {}ms (budget {}ms)",
                    issue_id,
                    elapsed.as_millis(),
                    budget.as_millis()
                ),
            );
        } else {
            tracing::debug!(issue = %issue_id, elapsed_us = elapsed.as_micros() as u64, "fast-path insert");
        }

        self.reconciler
            .schedule_reconcile(Instant::now() + self.inject.reconcile_delay());
        Ok(id)
    }

    /// Expand every visible occurrence of `node`, and its default flag
    fn expand_occurrences(&mut self, node: NodeId) {
        let filtered = self.view.filter.is_active();
        let contexts: Vec<Option<NodeId>> = self
            .rows
            .iter()
            .filter(|r| r.node == node)
            .map(|r| r.parent)
            .collect();
        self.graph.node_mut(node).expanded = true;
        for parent in contexts {
            self.view
                .expansion
                .set(&mut self.graph, node, parent, true, filtered);
        }
    }
}
