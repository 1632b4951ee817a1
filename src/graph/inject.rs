use std::collections::VecDeque;

use crate::model::Issue;

use super::node::{Graph, Node, NodeId};
use super::sort::{self, Contribution, SortKey};

/// Error type for fast-path insertion. Callers fall back to a full refresh.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InjectError {
    #[error("issue {id} is already in the graph")]
    AlreadyPresent { id: String },
    #[error("parent {parent} of {id} is not in the graph")]
    UnresolvedParent { id: String, parent: String },
}

/// Insert one new issue into a live graph without rebuilding it.
///
/// The parent is `parent_hint` when given, otherwise the issue's own
/// `parent-child` edge, otherwise the issue becomes a root. The node starts
/// collapsed with no known blockers. Only the new node's ancestor chain is
/// touched: aggregates bubble up until an ancestor already dominates, and any
/// ancestor whose sort key improved is moved to its new sibling position.
pub fn insert(
    graph: &mut Graph,
    issue: Issue,
    parent_hint: Option<&str>,
) -> Result<NodeId, InjectError> {
    if graph.lookup(&issue.id).is_some() {
        return Err(InjectError::AlreadyPresent { id: issue.id });
    }

    let parent_issue = parent_hint
        .or_else(|| issue.declared_parent())
        .map(str::to_string);
    let parent = match parent_issue {
        Some(parent_issue) => match graph.lookup(&parent_issue) {
            Some(p) => Some(p),
            None => {
                return Err(InjectError::UnresolvedParent {
                    id: issue.id,
                    parent: parent_issue,
                });
            }
        },
        None => None,
    };

    let id = graph.push(Node::new(issue));
    match parent {
        Some(parent) => {
            let pos = insertion_index(graph, &graph.node(parent).children, id);
            graph.node_mut(parent).children.insert(pos, id);
            let depth = graph.node(parent).depth + 1;
            let node = graph.node_mut(id);
            node.parents = vec![parent];
            node.parent = Some(parent);
            node.depth = depth;
            propagate(graph, id);
        }
        None => {
            let pos = insertion_index(graph, graph.roots(), id);
            graph.roots_mut().insert(pos, id);
        }
    }
    Ok(id)
}

/// First position in `siblings` whose key sorts after `node`'s
fn insertion_index(graph: &Graph, siblings: &[NodeId], node: NodeId) -> usize {
    let key = SortKey::of(graph.node(node));
    siblings.partition_point(|s| SortKey::of(graph.node(*s)) < key)
}

fn propagate(graph: &mut Graph, from: NodeId) {
    let start = Contribution::of(graph.node(from));
    let mut queue: VecDeque<(NodeId, Contribution)> = graph
        .node(from)
        .parents
        .iter()
        .map(|p| (*p, start))
        .collect();

    while let Some((ancestor, contribution)) = queue.pop_front() {
        let absorbed = sort::absorb(graph.node_mut(ancestor), contribution);
        if !absorbed.changed() {
            continue;
        }
        if absorbed.key_changed {
            reposition(graph, ancestor);
        }
        let next = Contribution::of(graph.node(ancestor));
        queue.extend(graph.node(ancestor).parents.iter().map(|p| (*p, next)));
    }
}

/// Move `id` to its sorted position in every list that holds it
fn reposition(graph: &mut Graph, id: NodeId) {
    let parents = graph.node(id).parents.clone();
    if parents.is_empty() {
        graph.roots_mut().retain(|r| *r != id);
        let pos = insertion_index(graph, graph.roots(), id);
        graph.roots_mut().insert(pos, id);
        return;
    }
    for parent in parents {
        graph.node_mut(parent).children.retain(|c| *c != id);
        let pos = insertion_index(graph, &graph.node(parent).children, id);
        graph.node_mut(parent).children.insert(pos, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build;
    use crate::model::Status;
    use chrono::{DateTime, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 14, 12, minute, 0).unwrap()
    }

    fn ids(graph: &Graph, list: &[NodeId]) -> Vec<String> {
        list.iter().map(|n| graph.node(*n).id().to_string()).collect()
    }

    fn children_of(graph: &Graph, id: &str) -> Vec<String> {
        ids(graph, &graph.get(id).unwrap().children)
    }

    fn backlog() -> Vec<Issue> {
        vec![
            Issue::new("epic", "Epic").with_priority(3),
            Issue::new("other", "Other epic").with_priority(2),
            Issue::new("t2", "Two").child_of("epic").with_priority(2),
            Issue::new("t3", "Three").child_of("epic").with_priority(3),
            Issue::new("done", "Done").child_of("epic").with_status(Status::Closed).with_priority(0),
        ]
    }

    #[test]
    fn inserts_in_sorted_position() {
        let mut graph = build(backlog()).unwrap();
        let new = Issue::new("t-new", "New").with_priority(2).with_updated_at(at(5));
        let id = insert(&mut graph, new, Some("epic")).unwrap();

        assert_eq!(children_of(&graph, "epic"), vec!["t-new", "t2", "t3", "done"]);
        let node = graph.node(id);
        assert_eq!(node.parent, graph.lookup("epic"));
        assert_eq!(node.depth, 1);
        assert!(!node.expanded);
    }

    #[test]
    fn uses_declared_parent_without_hint() {
        let mut graph = build(backlog()).unwrap();
        insert(&mut graph, Issue::new("t4", "Four").child_of("other"), None).unwrap();
        assert_eq!(children_of(&graph, "other"), vec!["t4"]);
    }

    #[test]
    fn parentless_issue_becomes_a_root() {
        let mut graph = build(backlog()).unwrap();
        insert(&mut graph, Issue::new("a-root", "Root").with_priority(0), None).unwrap();
        assert_eq!(ids(&graph, graph.roots())[0], "a-root");
    }

    #[test]
    fn urgent_child_lifts_and_repositions_its_epic() {
        let mut graph = build(vec![
            Issue::new("epic", "Epic").with_priority(3),
            Issue::new("other", "Other epic").with_priority(2),
            Issue::new("t3", "Three").child_of("epic").with_priority(3),
        ])
        .unwrap();
        assert_eq!(ids(&graph, graph.roots()), vec!["other", "epic"]);

        let fire = Issue::new("fire", "Fire")
            .with_status(Status::InProgress)
            .with_priority(1);
        insert(&mut graph, fire, Some("epic")).unwrap();

        let epic = graph.get("epic").unwrap();
        assert_eq!(epic.sort_priority, 1);
        assert!(epic.has_in_progress);
        assert_eq!(ids(&graph, graph.roots()), vec!["epic", "other"]);
    }

    #[test]
    fn bubbles_through_every_parent_path() {
        let mut graph = build(vec![
            Issue::new("e1", "E1").with_priority(4),
            Issue::new("e2", "E2").with_priority(4),
            Issue::new("t", "Shared").child_of("e1").child_of("e2").with_priority(4),
        ])
        .unwrap();
        let busy = Issue::new("s", "Sub").with_status(Status::InProgress).with_priority(1);
        insert(&mut graph, busy, Some("t")).unwrap();

        for id in ["t", "e1", "e2"] {
            let node = graph.get(id).unwrap();
            assert!(node.has_in_progress, "{id} should see in-progress work");
            assert_eq!(node.sort_priority, 1, "{id} should carry the urgent key");
        }
    }

    #[test]
    fn stops_at_a_dominating_ancestor() {
        let mut graph = build(vec![
            Issue::new("top", "Top").with_priority(0).with_updated_at(at(50)),
            Issue::new("mid", "Mid").child_of("top").with_priority(3),
        ])
        .unwrap();
        insert(&mut graph, Issue::new("leaf", "Leaf").with_priority(2), Some("mid")).unwrap();

        assert_eq!(graph.get("mid").unwrap().sort_priority, 2);
        let top = graph.get("top").unwrap();
        assert_eq!(top.sort_priority, 0);
        assert_eq!(top.sort_timestamp, at(50));
    }

    #[test]
    fn unresolved_parent_fails_without_touching_the_graph() {
        let mut graph = build(backlog()).unwrap();
        let err = insert(&mut graph, Issue::new("x", "X"), Some("nope")).unwrap_err();
        assert_eq!(
            err,
            InjectError::UnresolvedParent {
                id: "x".into(),
                parent: "nope".into()
            }
        );
        assert_eq!(graph.len(), 5);
        assert!(graph.lookup("x").is_none());
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut graph = build(backlog()).unwrap();
        let err = insert(&mut graph, Issue::new("t2", "Again"), Some("epic")).unwrap_err();
        assert_eq!(err, InjectError::AlreadyPresent { id: "t2".into() });
    }

    #[test]
    fn agrees_with_a_full_build() {
        let base = vec![
            Issue::new("e1", "E1").with_priority(3).with_updated_at(at(1)),
            Issue::new("e2", "E2").with_priority(2).with_updated_at(at(2)),
            Issue::new("a", "A").child_of("e1").with_priority(3).with_updated_at(at(3)),
            Issue::new("b", "B").child_of("e1").child_of("e2").with_priority(2).with_updated_at(at(4)),
        ];
        let new = Issue::new("n", "New")
            .child_of("b")
            .with_status(Status::InProgress)
            .with_priority(0)
            .with_updated_at(at(9));

        let mut live = build(base.clone()).unwrap();
        insert(&mut live, new.clone(), None).unwrap();

        let mut all = base;
        all.push(new);
        let rebuilt = build(all).unwrap();

        assert_eq!(ids(&live, live.roots()), ids(&rebuilt, rebuilt.roots()));
        for (_, node) in rebuilt.iter() {
            let other = live.get(node.id()).unwrap();
            assert_eq!(ids(&live, &other.children), ids(&rebuilt, &node.children));
            assert_eq!(other.sort_priority, node.sort_priority, "{}", node.id());
            assert_eq!(other.sort_timestamp, node.sort_timestamp, "{}", node.id());
            assert_eq!(other.has_in_progress, node.has_in_progress, "{}", node.id());
            assert_eq!(other.has_ready, node.has_ready, "{}", node.id());
        }
    }
}
