//! Ignore patterns for pattern-mode cleanup

use super::rules::CleanupRules;
use crate::templates::TemplateFetcher;
use std::fmt;
use tracing::{debug, warn};

/// Ignore file shipped at the root of the template repository
pub const IGNORE_FILE: &str = ".templateignore";

/// Where the active pattern list came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternSource {
    /// The repository's ignore file at the resolved reference
    Remote,
    /// The product's built-in list
    BuiltIn,
}

impl fmt::Display for PatternSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternSource::Remote => write!(f, "{}", IGNORE_FILE),
            PatternSource::BuiltIn => write!(f, "built-in patterns"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IgnorePatternSet {
    pub patterns: Vec<String>,
    pub source: PatternSource,
}

impl IgnorePatternSet {
    pub fn builtin(rules: &CleanupRules) -> Self {
        Self {
            patterns: rules.builtin_patterns.clone(),
            source: PatternSource::BuiltIn,
        }
    }

    /// Load the ignore file for `reference`, falling back to the built-in list
    /// when it is missing, unreadable, or has no patterns.
    pub async fn load(fetcher: &TemplateFetcher, reference: &str, rules: &CleanupRules) -> Self {
        match fetcher.fetch_raw_file(reference, IGNORE_FILE).await {
            Ok(content) => {
                let patterns = parse_ignore_file(&content);
                if patterns.is_empty() {
                    debug!("{} has no patterns, using built-in list", IGNORE_FILE);
                    Self::builtin(rules)
                } else {
                    debug!(count = patterns.len(), "loaded {}", IGNORE_FILE);
                    Self {
                        patterns,
                        source: PatternSource::Remote,
                    }
                }
            }
            Err(reason) => {
                warn!(%reason, "could not load {}, using built-in list", IGNORE_FILE);
                Self::builtin(rules)
            }
        }
    }
}

/// One pattern per line; blank lines and `#` comments are dropped
pub fn parse_ignore_file(content: &str) -> Vec<String> {
    content
        .trim_start_matches('\u{feff}')
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
