//! Development file pruning
//!
//! Two strategies are supported:
//! - Exact names: each top-level entry is classified against a whitelist and
//!   a denylist, and test-named entries are removed
//! - Patterns: globs from the repository's ignore file (or a built-in list)
//!   are expanded under the project root, skipping protected paths
//!
//! Failures to remove single entries are collected in the report and never
//! abort the pass.

pub mod patterns;
pub mod report;
pub mod rules;

pub use patterns::{parse_ignore_file, IgnorePatternSet, PatternSource, IGNORE_FILE};
pub use report::{CleanupReport, EntryKind, RemovalOutcome};
pub use rules::{is_test_file, literal_prefix, Classification, CleanupRules};

use crate::error::{Result, ScaffoldError};
use crate::templates::TemplateFetcher;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Cleanup strategy chosen by the product
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupMode {
    ExactNames,
    Patterns,
}

/// A cleanup strategy with everything it needs loaded
#[derive(Debug, Clone)]
pub enum CleanupPlan {
    ExactNames,
    Patterns(IgnorePatternSet),
}

impl CleanupPlan {
    /// Load the pattern list when `mode` needs one
    pub async fn prepare(
        mode: CleanupMode,
        fetcher: &TemplateFetcher,
        reference: &str,
        rules: &CleanupRules,
    ) -> Self {
        match mode {
            CleanupMode::ExactNames => CleanupPlan::ExactNames,
            CleanupMode::Patterns => {
                CleanupPlan::Patterns(IgnorePatternSet::load(fetcher, reference, rules).await)
            }
        }
    }
}

/// Removes development files from a freshly extracted project
#[derive(Debug, Clone)]
pub struct CleanupEngine {
    rules: CleanupRules,
    include_api_routes: bool,
}

impl CleanupEngine {
    pub fn new(rules: CleanupRules, include_api_routes: bool) -> Self {
        Self {
            rules,
            include_api_routes,
        }
    }

    /// Run one cleanup pass over `root`.
    ///
    /// Only an unreadable project root is an error.
    pub fn run(&self, root: &Path, plan: &CleanupPlan) -> Result<CleanupReport> {
        let mut report = CleanupReport::default();
        match plan {
            CleanupPlan::ExactNames => self.run_exact(root, &mut report)?,
            CleanupPlan::Patterns(set) => {
                self.remove_api_routes(root, &mut report);
                self.run_patterns(root, set, &mut report);
                report.pattern_source = Some(set.source.clone());
            }
        }

        debug!(
            files = report.files_removed,
            folders = report.folders_removed,
            failed = report.failed.len(),
            "cleanup finished"
        );
        Ok(report)
    }

    /// Remove the API routes directory when routes are excluded
    pub fn remove_api_routes(&self, root: &Path, report: &mut CleanupReport) {
        if self.include_api_routes {
            return;
        }
        report.record(remove_entry(root, Path::new(&self.rules.api_routes_dir)));
    }

    fn run_exact(&self, root: &Path, report: &mut CleanupReport) -> Result<()> {
        let read_error = |source: std::io::Error| ScaffoldError::Cleanup {
            path: root.to_path_buf(),
            source,
        };
        let mut names = std::fs::read_dir(root)
            .map_err(read_error)?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<std::io::Result<Vec<String>>>()
            .map_err(read_error)?;
        names.sort();

        for name in names {
            if name == self.rules.source_dir {
                self.remove_api_routes(root, report);
                continue;
            }
            match self.rules.classify(&name) {
                Classification::Remove => report.record(remove_entry(root, Path::new(&name))),
                Classification::Keep | Classification::Untouched => {}
            }
        }
        Ok(())
    }

    fn run_patterns(&self, root: &Path, set: &IgnorePatternSet, report: &mut CleanupReport) {
        let escaped_root = glob::Pattern::escape(&root.to_string_lossy());
        let mut matches: Vec<PathBuf> = Vec::new();

        for pattern in &set.patterns {
            if pattern.starts_with('!') {
                debug!(%pattern, "negated patterns are not supported, skipping");
                continue;
            }
            if self.rules.pattern_is_protected(pattern) {
                debug!(%pattern, "pattern overlaps a protected path, skipping");
                continue;
            }

            let relative_pattern = pattern
                .trim_start_matches("./")
                .trim_start_matches('/')
                .trim_end_matches('/');
            let full = format!("{}/{}", escaped_root, relative_pattern);
            let paths = match glob::glob_with(&full, rules::match_options()) {
                Ok(paths) => paths,
                Err(e) => {
                    warn!(%pattern, error = %e, "invalid cleanup pattern");
                    continue;
                }
            };

            for path in paths.flatten() {
                let Ok(relative) = path.strip_prefix(root) else {
                    continue;
                };
                if relative.as_os_str().is_empty() || self.rules.is_protected_path(relative) {
                    continue;
                }
                let relative = relative.to_path_buf();
                if !matches.contains(&relative) {
                    matches.push(relative);
                }
            }
        }

        for relative in matches {
            report.record(remove_entry(root, &relative));
        }
    }
}

/// Remove `root/relative`, reporting the path relative to `root`
pub fn remove_entry(root: &Path, relative: &Path) -> RemovalOutcome {
    let full = root.join(relative);
    let metadata = match std::fs::symlink_metadata(&full) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return RemovalOutcome::Skipped,
        Err(e) => {
            return RemovalOutcome::Failed {
                path: relative.to_path_buf(),
                reason: e.to_string(),
            }
        }
    };

    let (result, kind) = if metadata.is_dir() {
        (std::fs::remove_dir_all(&full), EntryKind::Folder)
    } else {
        (std::fs::remove_file(&full), EntryKind::File)
    };

    match result {
        Ok(()) => {
            debug!(path = %relative.display(), "removed");
            RemovalOutcome::Removed {
                path: relative.to_path_buf(),
                kind,
            }
        }
        Err(e) => {
            warn!(path = %relative.display(), error = %e, "failed to remove");
            RemovalOutcome::Failed {
                path: relative.to_path_buf(),
                reason: e.to_string(),
            }
        }
    }
}
