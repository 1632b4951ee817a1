use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use crate::graph::{self, BuildError, Graph};

use super::source::{IssueSource, SourceError};

/// Error type for a background refresh
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("fetch failed: {0}")]
    Source(#[from] SourceError),
    #[error("build failed: {0}")]
    Build(#[from] BuildError),
    #[error("refresh timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("could not start refresh worker: {0}")]
    Spawn(std::io::Error),
    #[error("refresh worker exited without a result")]
    WorkerLost,
}

/// Identifies one refresh attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket {
    pub generation: u64,
    /// Store mtime seen when the refresh was requested
    pub observed: Option<SystemTime>,
}

/// Result of a background refresh, delivered to the UI thread
#[derive(Debug)]
pub struct RefreshOutcome {
    pub ticket: RefreshTicket,
    pub result: Result<Graph, RefreshError>,
    pub elapsed: Duration,
}

/// Marks a fetch worker as running.
///
/// The flag stays set until the worker returns, including after its refresh
/// has already been reported as timed out, so callers can hold back the next
/// refresh instead of piling up stuck fetches.
#[derive(Debug, Clone, Default)]
pub struct FetchSlot(Arc<AtomicBool>);

impl FetchSlot {
    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn claim(&self) -> SlotGuard {
        self.0.store(true, Ordering::Release);
        SlotGuard(Arc::clone(&self.0))
    }
}

/// Clears the slot when the worker that owns it is dropped
struct SlotGuard(Arc<AtomicBool>);

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Export every issue and build a fresh graph
pub fn fetch_and_build(source: &dyn IssueSource) -> Result<Graph, RefreshError> {
    let issues = source.export()?;
    Ok(graph::build(issues)?)
}

/// Run [`fetch_and_build`] off the UI thread and send the outcome on `events`.
///
/// A supervisor thread waits at most `timeout` for the worker. On timeout the
/// outcome is a [`RefreshError::Timeout`]; the worker is left to finish on
/// its own and its late result is dropped. `slot` reads busy from this call
/// until the worker itself returns.
pub fn spawn_refresh<E>(
    source: Arc<dyn IssueSource>,
    ticket: RefreshTicket,
    timeout: Duration,
    slot: &FetchSlot,
    events: Sender<E>,
) where
    E: From<RefreshOutcome> + Send + 'static,
{
    let guard = slot.claim();
    let supervisor = thread::Builder::new()
        .name("beadtree-refresh".into())
        .spawn(move || {
            let started = Instant::now();
            let result = run_with_timeout(source, timeout, guard);
            let elapsed = started.elapsed();
            match &result {
                Ok(graph) => tracing::debug!(
                    generation = ticket.generation,
                    nodes = graph.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "refresh built"
                ),
                Err(err) => tracing::warn!(generation = ticket.generation, %err, "refresh failed"),
            }
            let _ = events.send(
                RefreshOutcome {
                    ticket,
                    result,
                    elapsed,
                }
                .into(),
            );
        });
    if let Err(err) = supervisor {
        tracing::error!(%err, "could not start refresh supervisor");
    }
}

fn run_with_timeout(
    source: Arc<dyn IssueSource>,
    timeout: Duration,
    guard: SlotGuard,
) -> Result<Graph, RefreshError> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("beadtree-fetch".into())
        .spawn(move || {
            let result = fetch_and_build(source.as_ref());
            drop(guard);
            let _ = tx.send(result);
        })
        .map_err(RefreshError::Spawn)?;
    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(RefreshError::Timeout(timeout)),
        Err(RecvTimeoutError::Disconnected) => Err(RefreshError::WorkerLost),
    }
}
