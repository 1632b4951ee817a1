use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use crate::model::Comment;

use super::source::{SourceError, run_capture};

/// Loads the comments of one issue
pub trait CommentLoader: Send + Sync {
    fn load(&self, issue_id: &str) -> Result<Vec<Comment>, SourceError>;
}

impl<F> CommentLoader for F
where
    F: Fn(&str) -> Result<Vec<Comment>, SourceError> + Send + Sync,
{
    fn load(&self, issue_id: &str) -> Result<Vec<Comment>, SourceError> {
        self(issue_id)
    }
}

/// Runs `<command...> <issue-id>` and parses a JSON array of comments
#[derive(Debug, Clone)]
pub struct CommandCommentLoader {
    argv: Vec<String>,
    cwd: PathBuf,
}

impl CommandCommentLoader {
    pub fn new(argv: Vec<String>, cwd: impl Into<PathBuf>) -> Self {
        CommandCommentLoader {
            argv,
            cwd: cwd.into(),
        }
    }
}

impl CommentLoader for CommandCommentLoader {
    fn load(&self, issue_id: &str) -> Result<Vec<Comment>, SourceError> {
        let mut argv = self.argv.clone();
        argv.push(issue_id.to_string());
        let stdout = run_capture(&argv, &self.cwd)?;
        if stdout.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&stdout)?)
    }
}

/// Comments (or the failure) for one issue
#[derive(Debug)]
pub struct CommentResult {
    pub issue_id: String,
    pub result: Result<Vec<Comment>, SourceError>,
}

/// Fixed set of worker threads fetching comments in the background.
///
/// At most `max_workers` loads run at once. Requests for an issue that is
/// already queued or loading are ignored until [`CommentPool::complete`] is
/// called for it.
pub struct CommentPool {
    jobs: Sender<String>,
    pending: HashSet<String>,
}

impl CommentPool {
    pub fn start<E>(loader: Arc<dyn CommentLoader>, max_workers: usize, events: Sender<E>) -> Self
    where
        E: From<CommentResult> + Send + 'static,
    {
        let (jobs, rx) = mpsc::channel::<String>();
        let rx = Arc::new(Mutex::new(rx));
        for i in 0..max_workers.max(1) {
            let rx = Arc::clone(&rx);
            let loader = Arc::clone(&loader);
            let events = events.clone();
            let spawned = thread::Builder::new()
                .name(format!("beadtree-comments-{i}"))
                .spawn(move || {
                    loop {
                        let next = match rx.lock() {
                            Ok(rx) => rx.recv(),
                            Err(_) => break,
                        };
                        let Ok(issue_id) = next else { break };
                        let result = loader.load(&issue_id);
                        if let Err(err) = &result {
                            tracing::debug!(issue = %issue_id, %err, "comment load failed");
                        }
                        if events.send(CommentResult { issue_id, result }.into()).is_err() {
                            break;
                        }
                    }
                });
            if let Err(err) = spawned {
                tracing::warn!(%err, worker = i, "could not start comment worker");
            }
        }
        CommentPool {
            jobs,
            pending: HashSet::new(),
        }
    }

    /// Queue a load. Returns false when one is already pending.
    pub fn request(&mut self, issue_id: &str) -> bool {
        if self.pending.contains(issue_id) {
            return false;
        }
        if self.jobs.send(issue_id.to_string()).is_err() {
            return false;
        }
        self.pending.insert(issue_id.to_string());
        true
    }

    /// Mark a load as delivered so the issue can be requested again
    pub fn complete(&mut self, issue_id: &str) {
        self.pending.remove(issue_id);
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn loader<F>(f: F) -> Arc<dyn CommentLoader>
    where
        F: Fn(&str) -> Result<Vec<Comment>, SourceError> + Send + Sync + 'static,
    {
        Arc::new(f)
    }

    fn comment(issue_id: &str, text: &str) -> Comment {
        Comment {
            id: 1,
            issue_id: issue_id.to_string(),
            author: "ana".into(),
            text: text.into(),
            created_at: Default::default(),
        }
    }

    #[test]
    fn never_exceeds_the_worker_bound() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (a, p) = (Arc::clone(&active), Arc::clone(&peak));
        let loader = loader(move |id| {
            let now = a.fetch_add(1, Ordering::SeqCst) + 1;
            p.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            a.fetch_sub(1, Ordering::SeqCst);
            Ok(vec![comment(id, "hi")])
        });

        let (tx, rx) = mpsc::channel::<CommentResult>();
        let mut pool = CommentPool::start(loader, 2, tx);
        for i in 0..8 {
            assert!(pool.request(&format!("bd-{i}")));
        }
        let mut seen = HashSet::new();
        for _ in 0..8 {
            let res = rx.recv_timeout(Duration::from_secs(5)).unwrap();
            assert_eq!(res.result.unwrap()[0].issue_id, res.issue_id);
            seen.insert(res.issue_id);
        }
        assert_eq!(seen.len(), 8);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn duplicate_requests_are_ignored_until_complete() {
        let loader = loader(|_| Ok(Vec::new()));
        let (tx, rx) = mpsc::channel::<CommentResult>();
        let mut pool = CommentPool::start(loader, 1, tx);

        assert!(pool.request("bd-1"));
        assert!(!pool.request("bd-1"));
        assert_eq!(pool.pending(), 1);

        let res = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        pool.complete(&res.issue_id);
        assert_eq!(pool.pending(), 0);
        assert!(pool.request("bd-1"));
    }

    #[test]
    fn failures_are_delivered_per_issue() {
        let loader = loader(|id| {
            if id == "bad" {
                Err(SourceError::Json(serde_json::from_str::<Vec<Comment>>("x").unwrap_err()))
            } else {
                Ok(Vec::new())
            }
        });
        let (tx, rx) = mpsc::channel::<CommentResult>();
        let mut pool = CommentPool::start(loader, 1, tx);
        pool.request("bad");
        let res = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(res.issue_id, "bad");
        assert!(res.result.is_err());
    }
}
