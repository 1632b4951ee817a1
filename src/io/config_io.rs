use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::model::Config;

use super::comments::{CommandCommentLoader, CommentLoader};
use super::create::{CommandCreator, IssueCreator};
use super::source::{CommandSource, IssueSource, JsonlSource};

pub const BEADS_DIR: &str = ".beads";
pub const CONFIG_FILE: &str = "beadtree.toml";

/// Error type for locating and loading a workspace
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("not a beads workspace: no {BEADS_DIR}/ directory found above {}", .0.display())]
    NotAWorkspace(PathBuf),
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// A discovered `.beads/` directory and its configuration
#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
    pub beads_dir: PathBuf,
    pub config: Config,
}

impl Workspace {
    /// Resolve a configured path against the `.beads/` directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.beads_dir.join(path)
        }
    }

    pub fn export_path(&self) -> PathBuf {
        self.resolve(&self.config.source.export)
    }

    pub fn store_path(&self) -> PathBuf {
        self.resolve(&self.config.source.store)
    }

    pub fn log_path(&self) -> PathBuf {
        self.resolve(&self.config.logging.file)
    }

    /// The configured export command, or the JSONL export file
    pub fn issue_source(&self) -> Arc<dyn IssueSource> {
        let command = &self.config.source.command;
        if command.is_empty() {
            Arc::new(JsonlSource::new(self.export_path()))
        } else {
            Arc::new(CommandSource::new(command.clone(), &self.root))
        }
    }

    pub fn issue_creator(&self) -> Arc<dyn IssueCreator> {
        Arc::new(CommandCreator::new(
            self.config.source.create.clone(),
            &self.root,
        ))
    }

    pub fn comment_loader(&self) -> Arc<dyn CommentLoader> {
        Arc::new(CommandCommentLoader::new(
            self.config.comments.command.clone(),
            &self.root,
        ))
    }
}

/// Walk up from `start` looking for a `.beads/` directory
pub fn discover_workspace(start: &Path) -> Result<PathBuf, ConfigError> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(BEADS_DIR).is_dir() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(ConfigError::NotAWorkspace(start.to_path_buf()));
        }
    }
}

/// Read `.beads/beadtree.toml`, falling back to defaults when it is absent
pub fn read_config(beads_dir: &Path) -> Result<Config, ConfigError> {
    let path = beads_dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(Config::default());
    }
    let text = fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        source: e,
    })?;
    toml::from_str(&text).map_err(|e| ConfigError::ParseError { path, source: e })
}

/// Discover the workspace above `start` and load its config
pub fn open_workspace(start: &Path) -> Result<Workspace, ConfigError> {
    let root = discover_workspace(start)?;
    let beads_dir = root.join(BEADS_DIR);
    let config = read_config(&beads_dir)?;
    Ok(Workspace {
        root,
        beads_dir,
        config,
    })
}
