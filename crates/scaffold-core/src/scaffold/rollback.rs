//! Shared rollback registration for the destination and scratch directories

use crate::error::{Result, ScaffoldError};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct Registered {
    destination: Option<PathBuf>,
    scratch: Vec<PathBuf>,
    rolled_back: bool,
}

/// Holds the directories this run created, if any.
///
/// Clones share state, so a signal handler can roll back the same destination
/// the orchestrator armed. Writers take [`RollbackHandle::hold`] around each
/// filesystem write; once a rollback has run, `hold` refuses and no further
/// files land in removed directories.
#[derive(Debug, Clone, Default)]
pub struct RollbackHandle {
    state: Arc<Mutex<Registered>>,
}

/// Proof that no rollback can run until it is dropped
pub struct WriteGuard<'a> {
    _state: MutexGuard<'a, Registered>,
}

impl RollbackHandle {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Registered> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `dest` for removal on failure
    pub fn arm(&self, dest: &Path) {
        debug!(path = %dest.display(), "rollback armed");
        self.slot().destination = Some(dest.to_path_buf());
    }

    /// Keep the destination; called once the project is complete
    pub fn disarm(&self) {
        self.slot().destination = None;
    }

    pub fn armed(&self) -> Option<PathBuf> {
        self.slot().destination.clone()
    }

    /// Create a scratch directory that must not outlive the run.
    ///
    /// Fails with `Cancelled` when a rollback already ran.
    pub fn create_scratch(&self, path: &Path) -> Result<()> {
        let mut state = self.slot();
        if state.rolled_back {
            return Err(ScaffoldError::Cancelled);
        }
        std::fs::create_dir_all(path)?;
        state.scratch.push(path.to_path_buf());
        Ok(())
    }

    /// Forget a scratch directory its owner is about to remove
    pub fn release_scratch(&self, path: &Path) {
        self.slot().scratch.retain(|p| p != path);
    }

    /// Block rollback for the duration of one write.
    ///
    /// Fails with `Cancelled` once a rollback has run.
    pub fn hold(&self) -> Result<WriteGuard<'_>> {
        let state = self.slot();
        if state.rolled_back {
            return Err(ScaffoldError::Cancelled);
        }
        Ok(WriteGuard { _state: state })
    }

    /// Remove the armed destination and every tracked scratch directory, best effort.
    ///
    /// Returns the removed destination. The handle refuses further writes
    /// afterwards, and a second call does nothing.
    pub fn rollback(&self) -> Option<PathBuf> {
        let mut state = self.slot();
        state.rolled_back = true;

        for scratch in std::mem::take(&mut state.scratch) {
            remove_quietly(&scratch, "scratch directory");
        }

        let path = state.destination.take()?;
        remove_quietly(&path, "destination").then_some(path)
    }
}

fn remove_quietly(path: &Path, what: &str) -> bool {
    match std::fs::remove_dir_all(path) {
        Ok(()) => {
            debug!(path = %path.display(), "rolled back {}", what);
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to roll back {}", what);
            false
        }
    }
}
