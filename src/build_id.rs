//! Build identity for cache invalidation
//!
//! A [`BuildId`] combines the crate version with the modification time of
//! the running executable, so any rebuild rotates the token even when the
//! version number is unchanged. The dedup cache discards all history when
//! the stored token no longer matches the current one.

use chrono::{DateTime, Utc};
use std::fmt;

/// Opaque token identifying the currently running build.
///
/// Compared by equality only. Construct once at startup and pass it to the
/// components that need it; there is no hidden global.
///
/// Known weakness: when the executable path or its mtime cannot be read,
/// the timestamp half degrades to `0` and invalidation becomes
/// version-only. Rebuilds with an unchanged version are then not detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildId(String);

impl BuildId {
    /// Compute the token for the running process.
    pub fn current() -> Self {
        let stamp = exe_mtime()
            .map(|t| t.format("%Y%m%d%H%M%S").to_string())
            .unwrap_or_else(|| "0".to_string());
        Self(format!("{}_{}", env!("CARGO_PKG_VERSION"), stamp))
    }

    /// Wrap a token read back from a cache file.
    pub fn from_token(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The token as written to the cache file's first line.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn exe_mtime() -> Option<DateTime<Utc>> {
    let exe = std::env::current_exe().ok()?;
    let modified = std::fs::metadata(exe).ok()?.modified().ok()?;
    Some(modified.into())
}
