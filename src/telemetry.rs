use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::metadata::LevelFilter;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

/// Environment variable holding a filter directive that overrides the config
pub const LOG_ENV: &str = "BEADTREE_LOG";

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("could not open log file {path}: {source}")]
    OpenLog {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not install log subscriber: {0}")]
    Install(String),
}

/// Where log lines go
#[derive(Debug, Clone)]
pub enum LogTarget {
    /// Append to a file. Used while the TUI owns the terminal.
    File(PathBuf),
    Stderr,
}

/// `BEADTREE_LOG` when set and valid, else `directive`, else `fallback`
fn build_filter(directive: &str, fallback: LevelFilter) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
        return filter;
    }
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(fallback.to_string()))
}

pub fn level_from_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    }
}

/// Install the global subscriber.
///
/// Returns an error if the log file cannot be opened or a subscriber is
/// already installed; callers treat both as non-fatal.
pub fn init(target: LogTarget, directive: &str) -> Result<(), TelemetryError> {
    let filter = build_filter(directive, LevelFilter::INFO);
    let layer: Box<dyn Layer<Registry> + Send + Sync> = match target {
        LogTarget::File(path) => {
            let file = open_log(&path)?;
            Box::new(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_names(true),
            )
        }
        LogTarget::Stderr => Box::new(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_target(false),
        ),
    };
    Registry::default()
        .with(layer)
        .with(filter)
        .try_init()
        .map_err(|e| TelemetryError::Install(e.to_string()))
}

fn open_log(path: &Path) -> Result<fs::File, TelemetryError> {
    let open_err = |source| TelemetryError::OpenLog {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        fs::create_dir_all(dir).map_err(open_err)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(open_err)
}
