//! Send/skip decision gate
//!
//! Wraps a [`CacheStore`] in one coarse process-wide lock. The whole
//! purge → lookup → record → persist sequence runs while the lock is held,
//! so concurrent callers for the same artifact id are totally ordered and
//! exactly one of them observes [`Decision::Allowed`] per window.

use crate::build_id::BuildId;
use crate::dedup::store::CacheStore;
use chrono::{DateTime, Duration, Utc};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::debug;

/// Default rolling dedup window
pub const DEFAULT_WINDOW_HOURS: i64 = 24;

/// Outcome of a dedup check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// First delivery of this artifact within the window; recorded and
    /// persisted before the gate is released
    Allowed,
    /// Already delivered inside the window; nothing recorded
    Duplicate,
}

/// Deduplication gate over a persisted send history
#[derive(Debug)]
pub struct DedupGate {
    state: Mutex<CacheStore>,
    path: PathBuf,
    window: Duration,
}

impl DedupGate {
    /// Open the gate, loading history from `path`.
    ///
    /// History recorded under a different build than `build_id` is
    /// discarded on load.
    pub fn open(path: PathBuf, build_id: BuildId, window: Duration) -> Self {
        let store = CacheStore::load(&path, &build_id);
        debug!(
            "Dedup gate opened with {} recorded artifacts (window {}h)",
            store.len(),
            window.num_hours()
        );
        Self {
            state: Mutex::new(store),
            path,
            window,
        }
    }

    /// Decide whether `artifact_id` may be sent at `now`.
    ///
    /// On [`Decision::Allowed`] the send is recorded and the cache file is
    /// rewritten before returning; on [`Decision::Duplicate`] nothing is
    /// persisted beyond the expiry purge.
    pub fn allow(&self, artifact_id: &str, now: DateTime<Utc>) -> Decision {
        let mut store = self.state.lock().unwrap_or_else(|e| e.into_inner());

        store.purge_expired(now, self.window);

        if let Some(last) = store.last_sent(artifact_id) {
            if now - last < self.window {
                debug!("Suppressing duplicate artifact {}", artifact_id);
                return Decision::Duplicate;
            }
        }

        store.record(artifact_id, now);
        store.save(&self.path);
        Decision::Allowed
    }

    /// The rolling window this gate enforces
    pub fn window(&self) -> Duration {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn gate(dir: &TempDir) -> DedupGate {
        DedupGate::open(
            dir.path().join("sent.dat"),
            BuildId::from_token("buildA"),
            Duration::hours(24),
        )
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn first_send_allowed_repeat_suppressed() {
        let dir = TempDir::new().unwrap();
        let gate = gate(&dir);

        assert_eq!(gate.allow("report.txt", t0()), Decision::Allowed);
        assert_eq!(
            gate.allow("report.txt", t0() + Duration::hours(12)),
            Decision::Duplicate
        );
        assert_eq!(
            gate.allow("report.txt", t0() + Duration::hours(25)),
            Decision::Allowed
        );
    }

    #[test]
    fn window_boundary() {
        let dir = TempDir::new().unwrap();
        let gate = gate(&dir);

        assert_eq!(gate.allow("a", t0()), Decision::Allowed);
        let just_inside = t0() + Duration::hours(24) - Duration::seconds(1);
        assert_eq!(gate.allow("a", just_inside), Decision::Duplicate);
        let just_outside = t0() + Duration::hours(24) + Duration::seconds(1);
        assert_eq!(gate.allow("a", just_outside), Decision::Allowed);
    }

    #[test]
    fn distinct_artifacts_do_not_interfere() {
        let dir = TempDir::new().unwrap();
        let gate = gate(&dir);

        assert_eq!(gate.allow("a", t0()), Decision::Allowed);
        assert_eq!(gate.allow("b", t0()), Decision::Allowed);
        assert_eq!(gate.allow("a", t0()), Decision::Duplicate);
    }

    #[test]
    fn decision_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sent.dat");

        let first = DedupGate::open(
            path.clone(),
            BuildId::from_token("buildA"),
            Duration::hours(24),
        );
        assert_eq!(first.allow("report.txt", t0()), Decision::Allowed);
        drop(first);

        let reopened = DedupGate::open(path, BuildId::from_token("buildA"), Duration::hours(24));
        assert_eq!(
            reopened.allow("report.txt", t0() + Duration::hours(1)),
            Decision::Duplicate
        );
    }

    #[test]
    fn build_change_resets_history() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sent.dat");

        let old = DedupGate::open(
            path.clone(),
            BuildId::from_token("buildA"),
            Duration::hours(24),
        );
        assert_eq!(old.allow("foo", t0()), Decision::Allowed);
        drop(old);

        let rebuilt = DedupGate::open(path, BuildId::from_token("buildB"), Duration::hours(24));
        assert_eq!(
            rebuilt.allow("foo", t0() + Duration::hours(1)),
            Decision::Allowed
        );
    }

    #[test]
    fn concurrent_same_artifact_allows_exactly_once() {
        let dir = TempDir::new().unwrap();
        let gate = Arc::new(gate(&dir));
        let now = t0();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let gate = Arc::clone(&gate);
                std::thread::spawn(move || gate.allow("hot.txt", now))
            })
            .collect();

        let decisions: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let allowed = decisions
            .iter()
            .filter(|d| **d == Decision::Allowed)
            .count();
        assert_eq!(allowed, 1);
        assert_eq!(decisions.len() - allowed, 15);
    }
}
