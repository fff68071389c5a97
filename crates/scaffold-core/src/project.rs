//! Project naming: normalization and validation of user-supplied names

use crate::error::{Result, ScaffoldError};
use std::fmt;

/// npm refuses package names longer than this
const MAX_NAME_LENGTH: usize = 214;

/// Names npm rejects regardless of shape
const RESERVED_NAMES: &[&str] = &["node_modules", "favicon.ico"];

/// A validated project name, used both as directory name and package name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectIdentity {
    raw: String,
    name: String,
}

impl ProjectIdentity {
    /// Normalize and validate a raw name
    pub fn new(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ScaffoldError::validation("Project name cannot be empty"));
        }

        let name = normalize(trimmed);
        if name.is_empty() {
            return Err(ScaffoldError::validation(format!(
                "Project name '{}' must contain at least one letter or digit",
                trimmed
            )));
        }
        if name.len() > MAX_NAME_LENGTH {
            return Err(ScaffoldError::validation(format!(
                "Project name is too long ({} characters, maximum is {})",
                name.len(),
                MAX_NAME_LENGTH
            )));
        }
        if RESERVED_NAMES.iter().any(|r| trimmed.eq_ignore_ascii_case(r)) {
            return Err(ScaffoldError::validation(format!(
                "'{}' is a reserved name and cannot be used",
                trimmed
            )));
        }

        Ok(Self {
            raw: trimmed.to_string(),
            name,
        })
    }

    /// The name as the user typed it
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The normalized name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ProjectIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Lowercase a name and hyphenate it at word boundaries.
///
/// Any character outside `[A-Za-z0-9]` separates words, as do case changes
/// (`myApp` -> `my-app`, `HTTPServer` -> `http-server`).
pub fn normalize(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_ascii_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if c.is_ascii_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            let boundary = prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_is_lower);
            if boundary {
                words.push(std::mem::take(&mut current));
            }
        }

        current.push(c.to_ascii_lowercase());
    }

    if !current.is_empty() {
        words.push(current);
    }

    words.join("-")
}

/// Check the normalized-name invariant: `^[a-z0-9-]+$`, no edge hyphens
pub fn is_normalized(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !name.starts_with('-')
        && !name.ends_with('-')
        && !name.contains("--")
}
