//! Keep/remove rules for development files shipped with a template

use glob::{MatchOptions, Pattern};
use std::path::Path;

/// Stem suffixes that mark a test file (`button-test.ts`, `api_spec.js`)
const TEST_STEM_SUFFIXES: &[&str] = &["-test", "_test", ".test", "-spec", "_spec", ".spec"];

/// Classification of a top-level entry by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Keep,
    Remove,
    Untouched,
}

/// Whitelists, denylists and patterns used by the cleanup engine
#[derive(Debug, Clone)]
pub struct CleanupRules {
    /// Top-level names that are never removed
    pub whitelist: Vec<String>,

    /// Top-level names removed in exact-name mode
    pub denylist: Vec<String>,

    /// Source directory; never bulk removed
    pub source_dir: String,

    /// API routes directory, relative to the project root
    pub api_routes_dir: String,

    /// Protected globs in pattern mode
    pub pattern_whitelist: Vec<String>,

    /// Patterns used when the template ships no usable ignore file
    pub builtin_patterns: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for CleanupRules {
    fn default() -> Self {
        Self {
            whitelist: strings(&[
                "src",
                "public",
                "package.json",
                "README.md",
                "LICENSE",
                ".gitignore",
                ".env.example",
                "index.html",
                "tsconfig.json",
                "tsconfig.node.json",
                "vite.config.ts",
                "vite.config.js",
            ]),
            denylist: strings(&[
                ".github",
                ".vscode",
                ".idea",
                ".husky",
                ".changeset",
                ".templateignore",
                ".eslintcache",
                "node_modules",
                "dist",
                "coverage",
                "docs",
                "scripts",
                "test",
                "tests",
                "__tests__",
                "e2e",
                "CONTRIBUTING.md",
                "CHANGELOG.md",
                "CODE_OF_CONDUCT.md",
                "renovate.json",
                "jest.config.js",
                "vitest.config.ts",
                "playwright.config.ts",
            ]),
            source_dir: "src".to_string(),
            api_routes_dir: "src/api".to_string(),
            pattern_whitelist: strings(&[
                "package.json",
                "README.md",
                "LICENSE",
                ".gitignore",
                "index.html",
                "public/**",
                "src/main.*",
            ]),
            builtin_patterns: strings(&[
                ".github",
                ".vscode",
                ".idea",
                ".husky",
                ".changeset",
                ".templateignore",
                "coverage",
                "docs",
                "e2e",
                "tests",
                "**/__tests__",
                "**/*.test.*",
                "**/*.spec.*",
                "CONTRIBUTING.md",
                "CHANGELOG.md",
                "CODE_OF_CONDUCT.md",
                "renovate.json",
            ]),
        }
    }
}

impl CleanupRules {
    /// Classify a top-level entry name. The whitelist is checked first.
    pub fn classify(&self, name: &str) -> Classification {
        if self.whitelist.iter().any(|w| w == name) {
            Classification::Keep
        } else if self.denylist.iter().any(|d| d == name) {
            Classification::Remove
        } else if is_test_file(name) {
            Classification::Remove
        } else {
            Classification::Untouched
        }
    }

    /// Whether a whole pattern is skipped because its literal prefix overlaps a
    /// protected glob (substring containment in either direction).
    pub fn pattern_is_protected(&self, pattern: &str) -> bool {
        let prefix = literal_prefix(pattern);
        self.pattern_whitelist.iter().any(|protected| {
            let protected = literal_prefix(protected);
            protected.contains(prefix) || prefix.contains(protected)
        })
    }

    /// Whether a path (relative to the project root) is protected in pattern mode.
    ///
    /// Matches the glob itself, anything under a protected directory, and any
    /// ancestor of a protected path.
    pub fn is_protected_path(&self, relative: &Path) -> bool {
        let rel = to_slash(relative);
        let options = match_options();

        self.pattern_whitelist.iter().any(|protected| {
            let prefix = literal_prefix(protected);
            let by_prefix = !prefix.is_empty()
                && (rel == prefix
                    || rel.starts_with(&format!("{}/", prefix))
                    || prefix.starts_with(&format!("{}/", rel)));
            by_prefix
                || Pattern::new(protected)
                    .map(|p| p.matches_with(&rel, options))
                    .unwrap_or(false)
        })
    }
}

/// Does a file or directory name follow a test naming convention?
pub fn is_test_file(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    if lower.contains(".test.") || lower.contains(".spec.") {
        return true;
    }

    let stem = match lower.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => lower.as_str(),
    };
    TEST_STEM_SUFFIXES.iter().any(|suffix| stem.ends_with(suffix))
}

/// A pattern with trailing pure-wildcard segments (`*`, `**`) removed
pub fn literal_prefix(pattern: &str) -> &str {
    let mut current = pattern.trim_start_matches("./").trim_start_matches('/');
    loop {
        let trimmed = current.trim_end_matches('/');
        match trimmed.rsplit_once('/') {
            Some((head, last)) if is_wildcard_segment(last) => current = head,
            None if is_wildcard_segment(trimmed) => return "",
            _ => return trimmed,
        }
    }
}

fn is_wildcard_segment(segment: &str) -> bool {
    !segment.is_empty() && segment.chars().all(|c| c == '*')
}

pub(crate) fn match_options() -> MatchOptions {
    MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    }
}

pub(crate) fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitelist_beats_denylist() {
        let mut rules = CleanupRules::default();
        rules.denylist.push("README.md".to_string());
        assert_eq!(rules.classify("README.md"), Classification::Keep);
        assert_eq!(rules.classify(".github"), Classification::Remove);
        assert_eq!(rules.classify("tailwind.config.js"), Classification::Untouched);
    }

    #[test]
    fn test_whitelisted_test_like_name_kept() {
        let mut rules = CleanupRules::default();
        rules.whitelist.push("setup.test.ts".to_string());
        assert_eq!(rules.classify("setup.test.ts"), Classification::Keep);
    }

    #[test]
    fn test_test_file_conventions() {
        assert!(is_test_file("app.test.ts"));
        assert!(is_test_file("Button.spec.tsx"));
        assert!(is_test_file("server_test.go"));
        assert!(is_test_file("api-spec.js"));
        assert!(is_test_file("smoke-test"));
        assert!(!is_test_file("latest.md"));
        assert!(!is_test_file("contest.ts"));
        assert!(!is_test_file("index.ts"));
        assert!(!is_test_file("testing-library.md"));
    }

    #[test]
    fn test_literal_prefix() {
        assert_eq!(literal_prefix("public/**"), "public");
        assert_eq!(literal_prefix("docs/*/**"), "docs");
        assert_eq!(literal_prefix("/.github/"), ".github");
        assert_eq!(literal_prefix("**/*.test.*"), "**/*.test.*");
        assert_eq!(literal_prefix("src/main.*"), "src/main.*");
        assert_eq!(literal_prefix("**"), "");
    }

    #[test]
    fn test_pattern_prefix_heuristic() {
        let rules = CleanupRules::default();
        // "public/assets/**" -> "public/assets" contains "public"
        assert!(rules.pattern_is_protected("public/assets/**"));
        // ".git" is a substring of ".gitignore", so the whole pattern is skipped
        assert!(rules.pattern_is_protected(".git"));
        assert!(!rules.pattern_is_protected(".github"));
        assert!(!rules.pattern_is_protected("**/*.test.*"));
        assert!(rules.pattern_is_protected("**"));
    }

    #[test]
    fn test_protected_paths() {
        let rules = CleanupRules::default();
        assert!(rules.is_protected_path(Path::new("package.json")));
        assert!(rules.is_protected_path(Path::new("public")));
        assert!(rules.is_protected_path(Path::new("public/favicon.test.svg")));
        assert!(rules.is_protected_path(Path::new("src/main.ts")));
        assert!(!rules.is_protected_path(Path::new("src/app.test.ts")));
        assert!(!rules.is_protected_path(Path::new("packages/package.json")));
    }
}
