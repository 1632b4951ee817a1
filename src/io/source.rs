use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use crate::model::Issue;

/// Error type for reading issues out of the tracker
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not run `{command}`: {source}")]
    SpawnError {
        command: String,
        source: std::io::Error,
    },
    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("line {line}: {source}")]
    ParseError {
        line: usize,
        source: serde_json::Error,
    },
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("command printed no issue")]
    EmptyOutput,
}

/// Where a full issue export comes from
pub trait IssueSource: Send + Sync {
    /// Read every issue, with its dependency edges
    fn export(&self) -> Result<Vec<Issue>, SourceError>;

    /// Short human-readable description for logs and `check`
    fn describe(&self) -> String;
}

/// Reads the tracker's JSONL export file
#[derive(Debug, Clone)]
pub struct JsonlSource {
    path: PathBuf,
}

impl JsonlSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonlSource { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IssueSource for JsonlSource {
    fn export(&self) -> Result<Vec<Issue>, SourceError> {
        let text = fs::read_to_string(&self.path).map_err(|e| SourceError::ReadError {
            path: self.path.clone(),
            source: e,
        })?;
        parse_jsonl(&text)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Runs an export command and parses its stdout.
///
/// Output may be JSONL or a single JSON array.
#[derive(Debug, Clone)]
pub struct CommandSource {
    argv: Vec<String>,
    cwd: PathBuf,
}

impl CommandSource {
    pub fn new(argv: Vec<String>, cwd: impl Into<PathBuf>) -> Self {
        CommandSource {
            argv,
            cwd: cwd.into(),
        }
    }
}

impl IssueSource for CommandSource {
    fn export(&self) -> Result<Vec<Issue>, SourceError> {
        let stdout = run_capture(&self.argv, &self.cwd)?;
        parse_export(&stdout)
    }

    fn describe(&self) -> String {
        self.argv.join(" ")
    }
}

/// Run `argv` in `cwd` and return its stdout
pub(crate) fn run_capture(argv: &[String], cwd: &Path) -> Result<String, SourceError> {
    let command = argv.join(" ");
    let Some((program, args)) = argv.split_first() else {
        return Err(SourceError::SpawnError {
            command,
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
        });
    };
    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .output()
        .map_err(|e| SourceError::SpawnError {
            command: command.clone(),
            source: e,
        })?;
    if !output.status.success() {
        return Err(SourceError::CommandFailed {
            command,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Parse a JSONL export, one issue per non-blank line
pub fn parse_jsonl(text: &str) -> Result<Vec<Issue>, SourceError> {
    let mut issues = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let issue = serde_json::from_str(line).map_err(|e| SourceError::ParseError {
            line: i + 1,
            source: e,
        })?;
        issues.push(issue);
    }
    Ok(issues)
}

/// Parse either a JSON array of issues or JSONL
pub fn parse_export(text: &str) -> Result<Vec<Issue>, SourceError> {
    if text.trim_start().starts_with('[') {
        Ok(serde_json::from_str(text)?)
    } else {
        parse_jsonl(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DepKind, Status};
    use tempfile::TempDir;

    const EXPORT: &str = r#"{"id":"bd-1","title":"Epic","status":"open","priority":1,"issue_type":"epic","created_at":"2025-05-01T10:00:00Z","updated_at":"2025-05-02T10:00:00Z"}

{"id":"bd-2","title":"Task","status":"in_progress","priority":2,"issue_type":"task","created_at":"2025-05-01T10:00:00Z","updated_at":"2025-05-03T10:00:00Z","dependencies":[{"issue_id":"bd-2","depends_on_id":"bd-1","type":"parent-child"}]}
"#;

    #[test]
    fn parses_jsonl_skipping_blank_lines() {
        let issues = parse_jsonl(EXPORT).unwrap();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[1].status, Status::InProgress);
        assert_eq!(issues[1].dependencies[0].kind, DepKind::ParentChild);
        assert_eq!(issues[1].declared_parent(), Some("bd-1"));
    }

    #[test]
    fn reports_the_bad_line() {
        let text = "{\"id\":\"bd-1\",\"title\":\"ok\"}\n{not json}\n";
        match parse_jsonl(text) {
            Err(SourceError::ParseError { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn accepts_a_json_array() {
        let issues = parse_export(r#"[{"id":"a","title":"A"},{"id":"b","title":"B"}]"#).unwrap();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].priority, 2);
    }

    #[test]
    fn jsonl_source_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("issues.jsonl");
        fs::write(&path, EXPORT).unwrap();
        let issues = JsonlSource::new(&path).export().unwrap();
        assert_eq!(issues[0].id, "bd-1");

        let missing = JsonlSource::new(tmp.path().join("nope.jsonl")).export();
        assert!(matches!(missing, Err(SourceError::ReadError { .. })));
    }

    #[test]
    fn empty_command_is_a_spawn_error() {
        let source = CommandSource::new(Vec::new(), ".");
        assert!(matches!(source.export(), Err(SourceError::SpawnError { .. })));
    }
}
