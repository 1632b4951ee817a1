use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Workflow status of an issue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Open,
    InProgress,
    Closed,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Open => "open",
            Status::InProgress => "in_progress",
            Status::Closed => "closed",
        }
    }

    pub fn is_closed(self) -> bool {
        self == Status::Closed
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a dependency edge between two issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DepKind {
    /// `issue_id` is a sub-item of `depends_on_id`
    ParentChild,
    /// `issue_id` is blocked until `depends_on_id` closes
    Blocks,
    Related,
    /// `issue_id` was found while working on `depends_on_id`
    DiscoveredFrom,
}

impl DepKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DepKind::ParentChild => "parent-child",
            DepKind::Blocks => "blocks",
            DepKind::Related => "related",
            DepKind::DiscoveredFrom => "discovered-from",
        }
    }
}

impl std::fmt::Display for DepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One typed edge as it appears in the tracker's export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub issue_id: String,
    pub depends_on_id: String,
    #[serde(rename = "type")]
    pub kind: DepKind,
}

/// A comment attached to an issue (loaded lazily)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub id: i64,
    pub issue_id: String,
    #[serde(default)]
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// A work item as exported by the issue tracker
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub status: Status,
    /// 0 (critical) through 4; lower sorts first
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub issue_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
}

fn default_priority() -> u8 {
    2
}

impl Issue {
    /// Create an open, priority-2 issue with unset timestamps
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Issue {
            id: id.into(),
            title: title.into(),
            priority: default_priority(),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_updated_at(mut self, at: DateTime<Utc>) -> Self {
        self.updated_at = at;
        self
    }

    /// Add an edge from this issue to `target`
    pub fn with_dep(mut self, kind: DepKind, target: &str) -> Self {
        self.dependencies.push(Dependency {
            issue_id: self.id.clone(),
            depends_on_id: target.to_string(),
            kind,
        });
        self
    }

    pub fn child_of(self, parent: &str) -> Self {
        self.with_dep(DepKind::ParentChild, parent)
    }

    pub fn blocked_by(self, blocker: &str) -> Self {
        self.with_dep(DepKind::Blocks, blocker)
    }

    /// The first parent this issue declares through its own edges
    pub fn declared_parent(&self) -> Option<&str> {
        self.dependencies
            .iter()
            .find(|d| d.kind == DepKind::ParentChild && d.issue_id == self.id)
            .map(|d| d.depends_on_id.as_str())
    }

    /// The id with its `prefix-` stripped (`bd-a1b2` → `a1b2`)
    pub fn short_id(&self) -> &str {
        self.id
            .split_once('-')
            .map_or(self.id.as_str(), |(_, rest)| rest)
    }

    /// Marker used to detect changes between two exports
    pub fn version_marker(&self) -> String {
        self.updated_at
            .to_rfc3339_opts(chrono::SecondsFormat::Nanos, true)
    }
}
