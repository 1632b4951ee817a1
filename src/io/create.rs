use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;

use crate::model::Issue;

use super::source::{SourceError, run_capture};

/// A new issue the user asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIssue {
    pub title: String,
    pub parent: Option<String>,
}

/// Creates issues in the tracker and returns them as stored
pub trait IssueCreator: Send + Sync {
    fn create(&self, request: &NewIssue) -> Result<Issue, SourceError>;
}

/// Runs `<command...> <title> [--parent <id>]` and parses the created issue
/// from stdout (a JSON object, or a one-element array)
#[derive(Debug, Clone)]
pub struct CommandCreator {
    argv: Vec<String>,
    cwd: PathBuf,
}

impl CommandCreator {
    pub fn new(argv: Vec<String>, cwd: impl Into<PathBuf>) -> Self {
        CommandCreator {
            argv,
            cwd: cwd.into(),
        }
    }

    pub fn command_for(&self, request: &NewIssue) -> Vec<String> {
        let mut argv = self.argv.clone();
        argv.push(request.title.clone());
        if let Some(parent) = &request.parent {
            argv.push("--parent".into());
            argv.push(parent.clone());
        }
        argv
    }
}

impl IssueCreator for CommandCreator {
    fn create(&self, request: &NewIssue) -> Result<Issue, SourceError> {
        let stdout = run_capture(&self.command_for(request), &self.cwd)?;
        parse_created(&stdout)
    }
}

fn parse_created(stdout: &str) -> Result<Issue, SourceError> {
    let text = stdout.trim();
    if text.starts_with('[') {
        let mut issues: Vec<Issue> = serde_json::from_str(text)?;
        if issues.is_empty() {
            return Err(SourceError::EmptyOutput);
        }
        return Ok(issues.swap_remove(0));
    }
    Ok(serde_json::from_str(text)?)
}

/// Outcome of a background create
#[derive(Debug)]
pub struct CreateResult {
    pub request: NewIssue,
    pub result: Result<Issue, SourceError>,
}

/// Run the creator off the UI thread and send the result on `events`
pub fn spawn_create<E>(creator: Arc<dyn IssueCreator>, request: NewIssue, events: Sender<E>)
where
    E: From<CreateResult> + Send + 'static,
{
    let spawned = thread::Builder::new()
        .name("beadtree-create".into())
        .spawn(move || {
            let result = creator.create(&request);
            let _ = events.send(CreateResult { request, result }.into());
        });
    if let Err(err) = spawned {
        tracing::error!(%err, "could not start create worker");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn builds_the_command_line() {
        let creator = CommandCreator::new(vec!["bd".into(), "create".into(), "--json".into()], ".");
        let argv = creator.command_for(&NewIssue {
            title: "Fix login".into(),
            parent: Some("bd-7".into()),
        });
        assert_eq!(argv, vec!["bd", "create", "--json", "Fix login", "--parent", "bd-7"]);
    }

    #[test]
    fn parses_object_or_array() {
        let issue = parse_created(r#"{"id":"bd-9","title":"New"}"#).unwrap();
        assert_eq!(issue.id, "bd-9");
        let issue = parse_created(r#"[{"id":"bd-10","title":"New"}]"#).unwrap();
        assert_eq!(issue.id, "bd-10");
        assert!(parse_created("[]").is_err());
    }

    #[test]
    fn delivers_results_in_the_background() {
        struct Echo;
        impl IssueCreator for Echo {
            fn create(&self, request: &NewIssue) -> Result<Issue, SourceError> {
                Ok(Issue::new("bd-new", request.title.clone()))
            }
        }
        let (tx, rx) = mpsc::channel::<CreateResult>();
        let request = NewIssue {
            title: "Write docs".into(),
            parent: None,
        };
        spawn_create(Arc::new(Echo), request.clone(), tx);
        let done = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(done.request, request);
        assert_eq!(done.result.unwrap().title, "Write docs");
    }
}
