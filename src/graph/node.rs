use std::collections::HashMap;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::model::{Comment, Issue, Status};

/// Handle to a node inside one [`Graph`] generation.
///
/// Handles are arena indices: they are cheap to copy, never own the node,
/// and mean nothing once the graph they came from is replaced. Anything that
/// must survive a rebuild is keyed by issue id instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One issue plus its structural edges and derived state
#[derive(Debug, Clone)]
pub struct Node {
    pub issue: Issue,
    /// Sub-items in display order. A child may appear under several parents.
    pub children: Vec<NodeId>,
    /// Every node listing this one as a child, in declaration order
    pub parents: Vec<NodeId>,
    /// Primary parent (the first declared)
    pub parent: Option<NodeId>,
    pub blocked_by: Vec<NodeId>,
    pub blocks: Vec<NodeId>,
    pub related: Vec<NodeId>,
    pub discovered_from: Vec<NodeId>,
    /// Any `blocked_by` entry is not closed
    pub is_blocked: bool,
    /// Self or a descendant is in progress
    pub has_in_progress: bool,
    /// Self or a descendant is ready to work on
    pub has_ready: bool,
    /// Default expansion when no filter or per-instance override applies
    pub expanded: bool,
    /// Best priority among self and descendants
    pub sort_priority: u8,
    /// Most recent update among the nodes holding `sort_priority`
    pub sort_timestamp: DateTime<Utc>,
    /// Depth along the primary-parent chain
    pub depth: usize,

    // --- Filled in by the comment loader ---
    pub comments_loaded: bool,
    pub comment_error: Option<String>,
    pub comments: Vec<Comment>,
}

impl Node {
    /// A detached node whose aggregates describe only itself
    pub fn new(issue: Issue) -> Self {
        let sort_priority = issue.priority;
        let sort_timestamp = issue.updated_at;
        let mut node = Node {
            issue,
            children: Vec::new(),
            parents: Vec::new(),
            parent: None,
            blocked_by: Vec::new(),
            blocks: Vec::new(),
            related: Vec::new(),
            discovered_from: Vec::new(),
            is_blocked: false,
            has_in_progress: false,
            has_ready: false,
            expanded: false,
            sort_priority,
            sort_timestamp,
            depth: 0,
            comments_loaded: false,
            comment_error: None,
            comments: Vec::new(),
        };
        node.reset_own_flags();
        node
    }

    pub fn id(&self) -> &str {
        &self.issue.id
    }

    pub fn status(&self) -> Status {
        self.issue.status
    }

    /// Open and not waiting on anything
    pub fn is_ready(&self) -> bool {
        self.issue.status == Status::Open && !self.is_blocked
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Reachable through more than one parent
    pub fn is_multi_parent(&self) -> bool {
        self.parents.len() > 1
    }

    /// Set the aggregate flags from this node's own state only
    pub(crate) fn reset_own_flags(&mut self) {
        self.has_in_progress = self.issue.status == Status::InProgress;
        self.has_ready = self.is_ready();
    }
}

/// One generation of the issue DAG.
///
/// Nodes live in an arena; children and parents are handle lists, so a node
/// with several parents is stored once and shared by all of them.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    index: IndexMap<String, NodeId>,
    roots: Vec<NodeId>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node to the arena. The caller links it.
    pub(crate) fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.index.insert(node.issue.id.clone(), id);
        self.nodes.push(node);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Resolve an issue id to its handle in this generation
    pub fn lookup(&self, issue_id: &str) -> Option<NodeId> {
        self.index.get(issue_id).copied()
    }

    pub fn get(&self, issue_id: &str) -> Option<&Node> {
        self.lookup(issue_id).map(|id| self.node(id))
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub(crate) fn roots_mut(&mut self) -> &mut Vec<NodeId> {
        &mut self.roots
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in issue-list order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Per-issue version markers, used to diff two generations
    pub fn versions(&self) -> HashMap<String, String> {
        self.nodes
            .iter()
            .map(|n| (n.issue.id.clone(), n.issue.version_marker()))
            .collect()
    }

    /// Set the default expansion of every node that has children
    pub fn expand_all(&mut self) {
        for node in &mut self.nodes {
            node.expanded = node.has_children();
        }
    }

    /// Every ancestor of `id` across all parent paths, nearest first
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut seen = vec![false; self.nodes.len()];
        let mut out = Vec::new();
        let mut queue: std::collections::VecDeque<NodeId> =
            self.node(id).parents.iter().copied().collect();
        while let Some(current) = queue.pop_front() {
            if seen[current.0] {
                continue;
            }
            seen[current.0] = true;
            out.push(current);
            queue.extend(self.node(current).parents.iter().copied());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_node_describes_itself() {
        let node = Node::new(Issue::new("bd-1", "Solo").with_priority(1));
        assert!(node.has_ready);
        assert!(!node.has_in_progress);
        assert_eq!(node.sort_priority, 1);
        assert!(!node.expanded);

        let node = Node::new(Issue::new("bd-2", "Busy").with_status(Status::InProgress));
        assert!(node.has_in_progress);
        assert!(!node.has_ready);
    }

    #[test]
    fn push_and_lookup() {
        let mut graph = Graph::new();
        let a = graph.push(Node::new(Issue::new("bd-1", "A")));
        let b = graph.push(Node::new(Issue::new("bd-2", "B")));
        assert_eq!(graph.lookup("bd-2"), Some(b));
        assert_eq!(graph.get("bd-1").map(|n| n.id()), Some("bd-1"));
        assert_eq!(graph.lookup("bd-3"), None);
        assert_ne!(a, b);
        assert_eq!(graph.len(), 2);
    }
}
