use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration from .beads/beadtree.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub inject: InjectConfig,
    #[serde(default)]
    pub comments: CommentsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

/// Where issues come from. Relative paths resolve against the beads directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// JSONL export read on every full refresh
    #[serde(default = "default_export")]
    pub export: PathBuf,
    /// Database whose mtime (plus -wal/-shm) signals changes
    #[serde(default = "default_store")]
    pub store: PathBuf,
    /// When non-empty, run this command and parse its stdout instead of reading `export`
    #[serde(default)]
    pub command: Vec<String>,
    /// Invoked as `<create...> <title> [--parent <id>]`; must print the new issue as JSON
    #[serde(default = "default_create_command")]
    pub create: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            export: default_export(),
            store: default_store(),
            command: Vec::new(),
            create: default_create_command(),
        }
    }
}

fn default_export() -> PathBuf {
    PathBuf::from("issues.jsonl")
}

fn default_store() -> PathBuf {
    PathBuf::from("beads.db")
}

fn default_create_command() -> Vec<String> {
    vec!["bd".into(), "create".into(), "--json".into()]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// A fetch+build that takes longer than this fails instead of hanging
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        RefreshConfig {
            poll_interval_ms: default_poll_interval_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl RefreshConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectConfig {
    /// Fast-path insertions slower than this raise a warning
    #[serde(default = "default_budget_ms")]
    pub budget_ms: u64,
    /// Delay before the follow-up full refresh
    #[serde(default = "default_reconcile_delay_ms")]
    pub reconcile_delay_ms: u64,
}

impl Default for InjectConfig {
    fn default() -> Self {
        InjectConfig {
            budget_ms: default_budget_ms(),
            reconcile_delay_ms: default_reconcile_delay_ms(),
        }
    }
}

impl InjectConfig {
    pub fn budget(&self) -> Duration {
        Duration::from_millis(self.budget_ms)
    }

    pub fn reconcile_delay(&self) -> Duration {
        Duration::from_millis(self.reconcile_delay_ms)
    }
}

fn default_budget_ms() -> u64 {
    50
}

fn default_reconcile_delay_ms() -> u64 {
    3000
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentsConfig {
    #[serde(default = "default_true")]
    pub prefetch: bool,
    /// Upper bound on concurrent comment fetches
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// Invoked as `<command...> <issue-id>`; must print a JSON array of comments
    #[serde(default = "default_comments_command")]
    pub command: Vec<String>,
}

impl Default for CommentsConfig {
    fn default() -> Self {
        CommentsConfig {
            prefetch: true,
            max_workers: default_max_workers(),
            command: default_comments_command(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_workers() -> usize {
    4
}

fn default_comments_command() -> Vec<String> {
    vec!["bd".into(), "comments".into(), "--json".into()]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_file")]
    pub file: PathBuf,
    /// `tracing` filter directive; `BEADTREE_LOG` takes precedence
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            file: default_log_file(),
            filter: default_log_filter(),
        }
    }
}

fn default_log_file() -> PathBuf {
    PathBuf::from("beadtree.log")
}

fn default_log_filter() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default)]
    pub colors: HashMap<String, String>,
    #[serde(default = "default_true")]
    pub show_detail: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            colors: HashMap::new(),
            show_detail: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.refresh.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.inject.budget(), Duration::from_millis(50));
        assert_eq!(config.comments.command, vec!["bd", "comments", "--json"]);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: Config = toml::from_str(
            r##"
[comments]
max_workers = 1

[ui]
show_detail = false

[ui.colors]
accent = "#ff8800"
"##,
        )
        .unwrap();
        assert_eq!(config.comments.max_workers, 1);
        assert!(config.comments.prefetch);
        assert!(!config.ui.show_detail);
        assert_eq!(config.ui.colors["accent"], "#ff8800");
        assert_eq!(config.logging.filter, "info");
    }
}
