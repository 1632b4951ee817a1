use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::io::fetch::RefreshTicket;

/// What changed between two graph generations, by issue id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Digest {
    pub added: Vec<String>,
    pub changed: Vec<String>,
    pub removed: Vec<String>,
}

impl Digest {
    /// Compare two id → version-marker maps. Ids are sorted in each list.
    pub fn between(old: &HashMap<String, String>, new: &HashMap<String, String>) -> Self {
        let mut digest = Digest::default();
        for (id, version) in new {
            match old.get(id) {
                None => digest.added.push(id.clone()),
                Some(prev) if prev != version => digest.changed.push(id.clone()),
                Some(_) => {}
            }
        }
        digest.removed = old
            .keys()
            .filter(|id| !new.contains_key(*id))
            .cloned()
            .collect();
        digest.added.sort();
        digest.changed.sort();
        digest.removed.sort();
        digest
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }

    /// Compact form for the status row, e.g. `+1 ~2 -0`
    pub fn summary(&self) -> String {
        format!(
            "+{} ~{} -{}",
            self.added.len(),
            self.changed.len(),
            self.removed.len()
        )
    }
}

/// The last refresh that was applied
#[derive(Debug, Clone)]
pub struct RefreshRecord {
    pub at: DateTime<Utc>,
    pub digest: Digest,
    pub elapsed: Duration,
}

/// Why a refresh is being requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The store's mtime moved past the last applied refresh
    StoreChanged,
    /// The user asked, or a fast-path insert failed
    Forced,
    /// Follow-up to a fast-path insert
    Reconcile,
}

/// Decides when a full refresh should run and keeps at most one in flight.
///
/// Overlapping triggers coalesce into a single pending request rather than
/// queueing. The recorded mtime only advances when a refresh succeeds, so
/// a failed refresh is retried on the next check.
#[derive(Debug, Default)]
pub struct Reconciler {
    last_seen: Option<SystemTime>,
    generation: u64,
    in_flight: Option<RefreshTicket>,
    forced: bool,
    reconcile_at: Option<Instant>,
    versions: HashMap<String, String>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with the generation the dashboard was opened with
    pub fn seeded(observed: Option<SystemTime>, versions: HashMap<String, String>) -> Self {
        Reconciler {
            last_seen: observed,
            versions,
            ..Self::default()
        }
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn versions(&self) -> &HashMap<String, String> {
        &self.versions
    }

    pub fn last_seen(&self) -> Option<SystemTime> {
        self.last_seen
    }

    /// Request a refresh at the next check regardless of mtime
    pub fn force(&mut self) {
        self.forced = true;
    }

    /// Request a refresh once `at` has passed
    pub fn schedule_reconcile(&mut self, at: Instant) {
        self.reconcile_at = Some(match self.reconcile_at {
            Some(existing) => existing.min(at),
            None => at,
        });
    }

    pub fn reconcile_pending(&self) -> bool {
        self.reconcile_at.is_some()
    }

    /// Issue a ticket if a refresh is due and none is running
    pub fn check(&mut self, mtime: Option<SystemTime>, now: Instant) -> Option<(RefreshTicket, Trigger)> {
        if self.in_flight.is_some() {
            return None;
        }
        let trigger = if self.forced {
            Trigger::Forced
        } else if self.reconcile_at.is_some_and(|at| at <= now) {
            Trigger::Reconcile
        } else if is_newer(mtime, self.last_seen) {
            Trigger::StoreChanged
        } else {
            return None;
        };

        self.forced = false;
        self.reconcile_at = None;
        self.generation += 1;
        let ticket = RefreshTicket {
            generation: self.generation,
            observed: mtime,
        };
        self.in_flight = Some(ticket);
        Some((ticket, trigger))
    }

    /// Clear the in-flight slot. False for a stale or unknown ticket.
    pub fn finish(&mut self, ticket: &RefreshTicket) -> bool {
        if self.in_flight.as_ref() != Some(ticket) {
            return false;
        }
        self.in_flight = None;
        true
    }

    /// Record a successfully applied refresh
    pub fn record_success(&mut self, ticket: &RefreshTicket, versions: HashMap<String, String>) {
        if ticket.observed.is_some() {
            self.last_seen = ticket.observed;
        }
        self.versions = versions;
    }
}

fn is_newer(current: Option<SystemTime>, seen: Option<SystemTime>) -> bool {
    match (current, seen) {
        (Some(current), Some(seen)) => current > seen,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn versions(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn digest_reports_added_changed_removed() {
        let old = versions(&[("A", "t0"), ("B", "t0")]);
        let new = versions(&[("B", "t1"), ("C", "t0")]);
        let digest = Digest::between(&old, &new);
        assert_eq!(
            digest,
            Digest {
                added: vec!["C".into()],
                changed: vec!["B".into()],
                removed: vec!["A".into()],
            }
        );
        assert_eq!(digest.summary(), "+1 ~1 -1");
        assert!(Digest::between(&new, &new).is_empty());
    }

    #[test]
    fn newer_mtime_triggers_once() {
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(100);
        let t1 = t0 + Duration::from_secs(1);
        let now = Instant::now();
        let mut rec = Reconciler::seeded(Some(t0), HashMap::new());

        assert!(rec.check(Some(t0), now).is_none());
        let (ticket, trigger) = rec.check(Some(t1), now).unwrap();
        assert_eq!(trigger, Trigger::StoreChanged);
        assert_eq!(ticket.observed, Some(t1));

        // in flight: further triggers coalesce
        rec.force();
        assert!(rec.check(Some(t1), now).is_none());

        assert!(rec.finish(&ticket));
        rec.record_success(&ticket, HashMap::new());
        let (_, trigger) = rec.check(Some(t1), now).unwrap();
        assert_eq!(trigger, Trigger::Forced);
    }

    #[test]
    fn failed_refresh_is_retried() {
        let t1 = SystemTime::UNIX_EPOCH + Duration::from_secs(5);
        let now = Instant::now();
        let mut rec = Reconciler::new();
        let (ticket, _) = rec.check(Some(t1), now).unwrap();
        assert!(rec.finish(&ticket));
        // no record_success
        assert!(rec.check(Some(t1), now).is_some());
    }

    #[test]
    fn stale_tickets_are_rejected() {
        let mut rec = Reconciler::new();
        rec.force();
        let (ticket, _) = rec.check(None, Instant::now()).unwrap();
        let stale = RefreshTicket {
            generation: ticket.generation + 1,
            observed: None,
        };
        assert!(!rec.finish(&stale));
        assert!(rec.in_flight());
        assert!(rec.finish(&ticket));
        assert!(!rec.finish(&ticket));
    }

    #[test]
    fn reconcile_waits_for_its_deadline() {
        let now = Instant::now();
        let mut rec = Reconciler::new();
        rec.schedule_reconcile(now + Duration::from_secs(3));
        assert!(rec.check(None, now).is_none());
        let (_, trigger) = rec.check(None, now + Duration::from_secs(3)).unwrap();
        assert_eq!(trigger, Trigger::Reconcile);
        assert!(!rec.reconcile_pending());
    }
}
