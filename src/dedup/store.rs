//! Persisted send-history cache
//!
//! One UTF-8 text file: line 1 is the build token, every following line is
//! `<artifact_id>|<RFC 3339 UTC timestamp>`. Timestamps are written with
//! microsecond precision and a `Z` suffix so they are fixed width and
//! lexically sortable. The file is rewritten wholesale on every save; the
//! entry set is small (one entry per distinct artifact name).
//!
//! Persistence is best effort. A missing, unreadable, or stale-build file
//! loads as an empty store, and a failed save leaves the in-memory state
//! authoritative for the rest of the process run. The file is owned by a
//! single process instance; concurrent processes sharing one path are
//! unsupported.

use crate::build_id::BuildId;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Field separator in cache file lines. Artifact ids containing it cannot
/// round-trip and their lines are skipped on load.
const SEPARATOR: char = '|';

/// In-memory send history, stamped with the build it was recorded under
#[derive(Debug, Clone)]
pub struct CacheStore {
    build_id: BuildId,
    entries: BTreeMap<String, DateTime<Utc>>,
}

impl CacheStore {
    /// Create an empty store stamped with the given build
    pub fn empty(build_id: BuildId) -> Self {
        Self {
            build_id,
            entries: BTreeMap::new(),
        }
    }

    /// Load the cache file at `path`, validating it against `current`.
    ///
    /// Never fails: a missing or unreadable file, or a stored build token
    /// that does not match `current`, yields an empty store. Malformed
    /// entry lines are skipped individually.
    pub fn load(path: &Path, current: &BuildId) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                debug!("No usable cache file at {}: {}", path.display(), e);
                return Self::empty(current.clone());
            }
        };

        let mut lines = content.lines();
        let stored = match lines.next() {
            Some(token) => BuildId::from_token(token),
            None => return Self::empty(current.clone()),
        };

        if stored != *current {
            debug!(
                "Cache build token {} does not match current {}, discarding history",
                stored, current
            );
            return Self::empty(current.clone());
        }

        let mut entries = BTreeMap::new();
        for line in lines {
            match parse_entry(line) {
                Some((id, at)) => {
                    entries.insert(id, at);
                }
                None => {
                    if !line.trim().is_empty() {
                        debug!("Skipping malformed cache line: {:?}", line);
                    }
                }
            }
        }

        Self {
            build_id: current.clone(),
            entries,
        }
    }

    /// Rewrite the cache file at `path` from the in-memory state.
    ///
    /// IO failures are logged and swallowed; the in-memory store stays
    /// authoritative.
    pub fn save(&self, path: &Path) {
        let mut out = String::with_capacity(64 + self.entries.len() * 64);
        out.push_str(self.build_id.as_str());
        out.push('\n');
        for (id, at) in &self.entries {
            out.push_str(id);
            out.push(SEPARATOR);
            out.push_str(&at.to_rfc3339_opts(SecondsFormat::Micros, true));
            out.push('\n');
        }

        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("Failed to create cache directory {}: {}", parent.display(), e);
                return;
            }
        }
        if let Err(e) = fs::write(path, out) {
            warn!("Failed to write cache file {}: {}", path.display(), e);
        }
    }

    /// Drop every entry older than `window` relative to `now`
    pub fn purge_expired(&mut self, now: DateTime<Utc>, window: Duration) {
        self.entries.retain(|_, at| now - *at <= window);
    }

    /// When the artifact was last recorded as sent, if ever
    pub fn last_sent(&self, artifact_id: &str) -> Option<DateTime<Utc>> {
        self.entries.get(artifact_id).copied()
    }

    /// Record a send of `artifact_id` at `now`
    pub fn record(&mut self, artifact_id: &str, now: DateTime<Utc>) {
        self.entries.insert(artifact_id.to_string(), now);
    }

    /// Build the store was recorded under
    pub fn build_id(&self) -> &BuildId {
        &self.build_id
    }

    /// Number of recorded artifacts
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether any artifact is recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_entry(line: &str) -> Option<(String, DateTime<Utc>)> {
    let (id, stamp) = line.split_once(SEPARATOR)?;
    if id.is_empty() {
        return None;
    }
    let at = DateTime::parse_from_rfc3339(stamp.trim()).ok()?;
    Some((id.to_string(), at.with_timezone(&Utc)))
}
