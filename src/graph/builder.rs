use std::time::Instant;

use crate::model::{DepKind, Issue};

use super::node::{Graph, Node, NodeId};
use super::sort::{self, Contribution};

/// Error type for graph construction. Any of these aborts the whole build.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("duplicate issue id {id}")]
    DuplicateIssue { id: String },
    #[error("{from} has a {kind} edge to unknown issue {missing}")]
    DanglingReference {
        from: String,
        missing: String,
        kind: DepKind,
    },
    #[error("parent-child cycle: {}", .path.join(" -> "))]
    Cycle { path: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Active,
    Done,
}

/// Build a linked, sorted DAG from a flat issue list.
///
/// Edges come from each issue's `dependencies`. The result has one node per
/// issue, every children list and the root list in sort order, and all
/// aggregate flags/keys computed bottom-up.
pub fn build(issues: Vec<Issue>) -> Result<Graph, BuildError> {
    let started = Instant::now();
    let mut graph = Graph::new();
    for issue in issues {
        if graph.lookup(&issue.id).is_some() {
            return Err(BuildError::DuplicateIssue { id: issue.id });
        }
        graph.push(Node::new(issue));
    }

    link_edges(&mut graph)?;

    for id in graph.ids().collect::<Vec<_>>() {
        let blocked = graph
            .node(id)
            .blocked_by
            .iter()
            .any(|b| !graph.node(*b).status().is_closed());
        let node = graph.node_mut(id);
        node.is_blocked = blocked;
        node.reset_own_flags();
    }

    let mut marks = vec![Mark::Unvisited; graph.len()];
    for id in graph.ids().collect::<Vec<_>>() {
        if marks[id.index()] == Mark::Unvisited {
            aggregate(&mut graph, id, &mut marks)?;
        }
    }

    for id in graph.ids().collect::<Vec<_>>() {
        sort_children(&mut graph, id);
        let expanded = graph
            .node(id)
            .children
            .iter()
            .any(|c| graph.node(*c).has_in_progress);
        graph.node_mut(id).expanded = expanded;
    }

    let mut roots: Vec<NodeId> = graph
        .iter()
        .filter(|(_, n)| n.parents.is_empty())
        .map(|(id, _)| id)
        .collect();
    roots.sort_by(|a, b| sort::compare(graph.node(*a), graph.node(*b)));
    *graph.roots_mut() = roots;

    let depths = primary_depths(&graph);
    for id in graph.ids().collect::<Vec<_>>() {
        let depth = depths[id.index()];
        let node = graph.node_mut(id);
        node.parent = node.parents.first().copied();
        node.depth = depth;
    }

    tracing::debug!(
        issues = graph.len(),
        roots = graph.roots().len(),
        elapsed_us = started.elapsed().as_micros() as u64,
        "graph built"
    );
    Ok(graph)
}

fn link_edges(graph: &mut Graph) -> Result<(), BuildError> {
    for owner in graph.ids().collect::<Vec<_>>() {
        let deps = graph.node(owner).issue.dependencies.clone();
        for dep in deps {
            let resolve = |id: &str| {
                graph.lookup(id).ok_or_else(|| BuildError::DanglingReference {
                    from: graph.node(owner).id().to_string(),
                    missing: id.to_string(),
                    kind: dep.kind,
                })
            };
            let from = resolve(&dep.issue_id)?;
            let to = resolve(&dep.depends_on_id)?;

            match dep.kind {
                DepKind::ParentChild => {
                    if from == to {
                        return Err(BuildError::Cycle {
                            path: vec![dep.issue_id.clone(), dep.issue_id],
                        });
                    }
                    push_unique(&mut graph.node_mut(to).children, from);
                    push_unique(&mut graph.node_mut(from).parents, to);
                }
                DepKind::Blocks => {
                    push_unique(&mut graph.node_mut(from).blocked_by, to);
                    push_unique(&mut graph.node_mut(to).blocks, from);
                }
                DepKind::Related => {
                    push_unique(&mut graph.node_mut(from).related, to);
                    push_unique(&mut graph.node_mut(to).related, from);
                }
                DepKind::DiscoveredFrom => {
                    push_unique(&mut graph.node_mut(from).discovered_from, to);
                }
            }
        }
    }
    Ok(())
}

fn push_unique(list: &mut Vec<NodeId>, id: NodeId) {
    if !list.contains(&id) {
        list.push(id);
    }
}

/// Post-order walk from `root`: detect parent-child cycles and fold each
/// child's aggregates into its parent. Runs on an explicit stack.
fn aggregate(graph: &mut Graph, root: NodeId, marks: &mut [Mark]) -> Result<(), BuildError> {
    // The current path, each node with the index of its next unvisited child
    let mut stack: Vec<(NodeId, usize)> = vec![(root, 0)];
    marks[root.index()] = Mark::Active;

    while let Some(top) = stack.last_mut() {
        let (id, next) = *top;
        let Some(&child) = graph.node(id).children.get(next) else {
            stack.pop();
            marks[id.index()] = Mark::Done;
            if let Some(&(parent, _)) = stack.last() {
                let contribution = Contribution::of(graph.node(id));
                sort::absorb(graph.node_mut(parent), contribution);
            }
            continue;
        };
        top.1 += 1;

        match marks[child.index()] {
            Mark::Active => {
                let start = stack.iter().position(|(p, _)| *p == child).unwrap_or(0);
                let mut cycle: Vec<String> = stack[start..]
                    .iter()
                    .map(|(p, _)| graph.node(*p).id().to_string())
                    .collect();
                cycle.push(graph.node(child).id().to_string());
                return Err(BuildError::Cycle { path: cycle });
            }
            Mark::Unvisited => {
                marks[child.index()] = Mark::Active;
                stack.push((child, 0));
            }
            Mark::Done => {
                let contribution = Contribution::of(graph.node(child));
                sort::absorb(graph.node_mut(id), contribution);
            }
        }
    }
    Ok(())
}

fn sort_children(graph: &mut Graph, id: NodeId) {
    let mut children = std::mem::take(&mut graph.node_mut(id).children);
    children.sort_by(|a, b| sort::compare(graph.node(*a), graph.node(*b)));
    graph.node_mut(id).children = children;
}

/// Depth of every node along its first-parent chain, each chain walked once
fn primary_depths(graph: &Graph) -> Vec<usize> {
    let mut depths: Vec<Option<usize>> = vec![None; graph.len()];
    let mut chain = Vec::new();
    for id in graph.ids() {
        let mut current = id;
        let mut depth = loop {
            if let Some(known) = depths[current.index()] {
                break known;
            }
            match graph.node(current).parents.first() {
                Some(parent) => {
                    chain.push(current);
                    current = *parent;
                }
                None => {
                    depths[current.index()] = Some(0);
                    break 0;
                }
            }
        };
        while let Some(below) = chain.pop() {
            depth += 1;
            depths[below.index()] = Some(depth);
        }
    }
    depths.into_iter().map(|d| d.unwrap_or(0)).collect()
}
