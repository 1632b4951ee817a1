//! Ordering policy shared by the builder and the fast-path injector.
//!
//! Siblings (and roots) sort by:
//! 1. open / in-progress before closed
//! 2. aggregate priority, ascending
//! 3. aggregate timestamp, most recent first
//! 4. issue id, ascending
//!
//! The aggregate priority/timestamp of a node is the best key among the node
//! and all of its descendants, so a parent holding urgent work sorts as urgent.
//! Both the full build and the incremental insert fold descendants through
//! [`absorb`], which keeps the two update paths from drifting apart.

use std::cmp::{Ordering, Reverse};

use chrono::{DateTime, Utc};

use super::node::Node;

/// Priority/recency pair that propagates up the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateKey {
    pub priority: u8,
    pub timestamp: DateTime<Utc>,
}

impl AggregateKey {
    pub fn of(node: &Node) -> Self {
        AggregateKey {
            priority: node.sort_priority,
            timestamp: node.sort_timestamp,
        }
    }

    fn rank(&self) -> (u8, Reverse<DateTime<Utc>>) {
        (self.priority, Reverse(self.timestamp))
    }

    /// `self` is at least as good as `other`
    pub fn dominates(&self, other: &AggregateKey) -> bool {
        self.rank() <= other.rank()
    }
}

/// Full sibling ordering key for one node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey<'a> {
    pub closed: bool,
    pub aggregate: AggregateKey,
    pub id: &'a str,
}

impl<'a> SortKey<'a> {
    pub fn of(node: &'a Node) -> Self {
        SortKey {
            closed: node.status().is_closed(),
            aggregate: AggregateKey::of(node),
            id: node.id(),
        }
    }
}

impl Ord for SortKey<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.closed
            .cmp(&other.closed)
            .then_with(|| self.aggregate.rank().cmp(&other.aggregate.rank()))
            .then_with(|| self.id.cmp(other.id))
    }
}

impl PartialOrd for SortKey<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Compare two nodes for sibling order
pub fn compare(a: &Node, b: &Node) -> Ordering {
    SortKey::of(a).cmp(&SortKey::of(b))
}

/// What a subtree contributes to each of its ancestors
#[derive(Debug, Clone, Copy)]
pub struct Contribution {
    pub in_progress: bool,
    pub ready: bool,
    pub key: AggregateKey,
}

impl Contribution {
    pub fn of(node: &Node) -> Self {
        Contribution {
            in_progress: node.has_in_progress,
            ready: node.has_ready,
            key: AggregateKey::of(node),
        }
    }
}

/// Result of folding a contribution into an ancestor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Absorbed {
    pub flags_changed: bool,
    pub key_changed: bool,
}

impl Absorbed {
    pub fn changed(&self) -> bool {
        self.flags_changed || self.key_changed
    }
}

/// Fold a descendant's contribution into `node`.
///
/// Returns what changed; an unchanged result means `node` already dominates
/// the contribution and nothing above it needs revisiting.
pub fn absorb(node: &mut Node, contribution: Contribution) -> Absorbed {
    let mut out = Absorbed::default();
    if contribution.in_progress && !node.has_in_progress {
        node.has_in_progress = true;
        out.flags_changed = true;
    }
    if contribution.ready && !node.has_ready {
        node.has_ready = true;
        out.flags_changed = true;
    }
    let current = AggregateKey::of(node);
    if contribution.key != current && contribution.key.dominates(&current) {
        node.sort_priority = contribution.key.priority;
        node.sort_timestamp = contribution.key.timestamp;
        out.key_changed = true;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Issue, Status};
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 14, hour, 0, 0).unwrap()
    }

    fn node(id: &str, status: Status, priority: u8, hour: u32) -> Node {
        Node::new(
            Issue::new(id, id)
                .with_status(status)
                .with_priority(priority)
                .with_updated_at(at(hour)),
        )
    }

    #[test]
    fn closed_sorts_after_open() {
        let open = node("b", Status::Open, 4, 1);
        let closed = node("a", Status::Closed, 0, 9);
        assert_eq!(compare(&open, &closed), Ordering::Less);
    }

    #[test]
    fn in_progress_and_open_share_a_bucket() {
        let busy = node("b", Status::InProgress, 2, 1);
        let open = node("a", Status::Open, 1, 1);
        assert_eq!(compare(&open, &busy), Ordering::Less);
    }

    #[test]
    fn recency_breaks_priority_ties() {
        let older = node("a", Status::Open, 1, 1);
        let newer = node("b", Status::Open, 1, 5);
        assert_eq!(compare(&newer, &older), Ordering::Less);
    }

    #[test]
    fn id_is_the_final_tie_break() {
        let a = node("a", Status::Open, 1, 1);
        let b = node("b", Status::Open, 1, 1);
        assert_eq!(compare(&a, &b), Ordering::Less);
        assert_eq!(compare(&a, &a), Ordering::Equal);
    }

    #[test]
    fn absorb_takes_better_key_and_flags() {
        let mut parent = node("p", Status::Open, 3, 1);
        let child = node("c", Status::InProgress, 1, 2);
        let result = absorb(&mut parent, Contribution::of(&child));
        assert!(result.flags_changed);
        assert!(result.key_changed);
        assert_eq!(parent.sort_priority, 1);
        assert_eq!(parent.sort_timestamp, at(2));
        assert!(parent.has_in_progress);
    }

    #[test]
    fn absorb_stops_when_dominated() {
        let mut parent = node("p", Status::InProgress, 0, 5);
        let child = node("c", Status::InProgress, 2, 1);
        let result = absorb(&mut parent, Contribution::of(&child));
        assert!(!result.changed());
        assert_eq!(parent.sort_priority, 0);
    }
}
