//! Cleanup results

use super::patterns::PatternSource;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Folder,
}

/// Result of removing one path
#[derive(Debug)]
pub enum RemovalOutcome {
    Removed { path: PathBuf, kind: EntryKind },
    /// Already gone (e.g. inside a folder removed earlier)
    Skipped,
    Failed { path: PathBuf, reason: String },
}

/// What a cleanup pass removed, relative to the project root
#[derive(Debug, Clone, Default)]
pub struct CleanupReport {
    pub files_removed: usize,
    pub folders_removed: usize,
    pub removed: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
    /// Set in pattern mode
    pub pattern_source: Option<PatternSource>,
}

impl CleanupReport {
    pub fn total_removed(&self) -> usize {
        self.files_removed + self.folders_removed
    }

    pub(crate) fn record(&mut self, outcome: RemovalOutcome) {
        match outcome {
            RemovalOutcome::Removed { path, kind } => {
                match kind {
                    EntryKind::File => self.files_removed += 1,
                    EntryKind::Folder => self.folders_removed += 1,
                }
                self.removed.push(path);
            }
            RemovalOutcome::Skipped => {}
            RemovalOutcome::Failed { path, reason } => self.failed.push((path, reason)),
        }
    }

    /// At most `limit` removed paths, plus how many were left out
    pub fn preview(&self, limit: usize) -> (Vec<String>, usize) {
        let shown = self
            .removed
            .iter()
            .take(limit)
            .map(|p| p.display().to_string())
            .collect();
        (shown, self.removed.len().saturating_sub(limit))
    }
}
