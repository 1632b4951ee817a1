use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::graph::Node;
use crate::model::Status;

/// Status-based view mode, cycled from the keyboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    All,
    /// Everything not closed
    Active,
    /// Open and not blocked
    Ready,
}

impl ViewMode {
    pub fn next(self) -> Self {
        match self {
            ViewMode::All => ViewMode::Active,
            ViewMode::Active => ViewMode::Ready,
            ViewMode::Ready => ViewMode::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ViewMode::All => "all",
            ViewMode::Active => "active",
            ViewMode::Ready => "ready",
        }
    }

    pub fn admits(self, node: &Node) -> bool {
        match self {
            ViewMode::All => true,
            ViewMode::Active => node.status() != Status::Closed,
            ViewMode::Ready => node.is_ready(),
        }
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(ViewMode::All),
            "active" => Ok(ViewMode::Active),
            "ready" => Ok(ViewMode::Ready),
            other => Err(format!("unknown view mode '{}' (all, active, ready)", other)),
        }
    }
}

/// Active text + view-mode filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub text: String,
    pub mode: ViewMode,
}

impl Filter {
    pub fn new(text: impl Into<String>, mode: ViewMode) -> Self {
        Filter {
            text: text.into(),
            mode,
        }
    }

    /// Whether any predicate narrows the outline
    pub fn is_active(&self) -> bool {
        !self.text.trim().is_empty() || self.mode != ViewMode::All
    }

    pub fn matcher(&self) -> Matcher {
        Matcher {
            needle: self.text.trim().to_lowercase(),
            mode: self.mode,
        }
    }
}

/// A filter prepared for repeated evaluation
#[derive(Debug, Clone)]
pub struct Matcher {
    needle: String,
    mode: ViewMode,
}

impl Matcher {
    /// Both predicates hold for the node itself (ignoring descendants)
    pub fn matches(&self, node: &Node) -> bool {
        self.mode.admits(node) && self.text_matches(node)
    }

    fn text_matches(&self, node: &Node) -> bool {
        if self.needle.is_empty() {
            return true;
        }
        let issue = &node.issue;
        issue.title.to_lowercase().contains(&self.needle)
            || issue.id.to_lowercase().contains(&self.needle)
            || issue.short_id().to_lowercase().contains(&self.needle)
    }
}
