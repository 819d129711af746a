//! Sentinel-file stop channel.
//!
//! Cooperative shutdown signal shared with the engine process: the
//! supervisor creates a marker file at a well-known path, the engine polls
//! for it on its own schedule. Delivery is never guaranteed or timely,
//! which is why the supervisor escalates to SIGTERM/SIGKILL when the
//! sentinel goes unobserved.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Filesystem-based cooperative shutdown signal.
#[derive(Debug, Clone)]
pub struct StopSignalChannel {
    path: PathBuf,
}

impl StopSignalChannel {
    /// Create a channel at the given sentinel path. No filesystem access
    /// happens until `create`/`remove`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Sentinel path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the sentinel. Idempotent; an unwritable location logs a
    /// warning and does not abort the session (the terminate/kill
    /// escalation covers an undelivered signal).
    pub fn create(&self) {
        if self.exists() {
            debug!(path = %self.path.display(), "Stop sentinel already present");
            return;
        }
        match std::fs::write(&self.path, b"stop\n") {
            Ok(()) => debug!(path = %self.path.display(), "Stop sentinel created"),
            Err(e) => {
                warn!(path = %self.path.display(), ?e, "Could not create stop sentinel");
            }
        }
    }

    /// Whether the sentinel is currently present.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Remove the sentinel. Idempotent and safe to call when it was never
    /// created; a stale sentinel must never leak into the next session.
    pub fn remove(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Stop sentinel removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Stop sentinel was not present");
            }
            Err(e) => {
                warn!(path = %self.path.display(), ?e, "Could not remove stop sentinel");
            }
        }
    }
}
