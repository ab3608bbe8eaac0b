//! Completion log: one line per successfully downloaded file, shared by all workers.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::utils::config::LOG_STRIP_SEGMENTS;

/// Drop the namespace and type-tag segments from a remote key. Keys with no more than that many
/// segments are kept whole.
pub fn strip_log_prefix(remote_key: &str) -> &str {
    let mut rest = remote_key;
    for _ in 0..LOG_STRIP_SEGMENTS {
        match rest.split_once('/') {
            Some((_, tail)) => rest = tail,
            None => return remote_key,
        }
    }
    rest
}

/// Append-only log file. Every file operation happens under one mutex; the guard is released on
/// every exit path and a poisoned lock is recovered rather than propagated.
pub struct ProgressLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ProgressLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create or truncate the log. Call once before workers start.
    pub fn initialize(&self) -> Result<()> {
        let _guard = self.guard();
        std::fs::write(&self.path, b"")
            .with_context(|| format!("initialize progress log {}", self.path.display()))
    }

    /// Append `remote_key` minus its storage prefix, newline-terminated.
    pub fn append(&self, remote_key: &str) -> Result<()> {
        let line = strip_log_prefix(remote_key);
        let _guard = self.guard();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open progress log {}", self.path.display()))?;
        writeln!(file, "{line}")
            .with_context(|| format!("append to progress log {}", self.path.display()))
    }
}
