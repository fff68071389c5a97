//! Product configuration trait for CLI binaries
//!
//! Each binary describes the template repository it scaffolds from by
//! implementing this trait. Everything else in the pipeline is shared.

use crate::cleanup::{CleanupMode, CleanupRules};
use crate::scaffold::ScaffoldSummary;

/// Configuration trait for different CLI products
///
/// Each product implements this trait to define:
/// - Product identity (name, display name)
/// - Template repository and endpoints
/// - Framework variants and cleanup behaviour
/// - Post-setup instructions
pub trait ProductConfig: Clone + Send + Sync + 'static {
    /// Internal product name (used for CLI command and user agent)
    fn name(&self) -> &'static str;

    /// Human-readable display name
    fn display_name(&self) -> &'static str;

    /// GitHub repository holding the template, as `owner/repo`
    fn template_repo(&self) -> &'static str;

    /// Reference used when the latest release cannot be discovered
    fn fallback_reference(&self) -> &'static str;

    /// Prefix for environment variable overrides (e.g. `CREATE_WEBAPP`)
    fn env_prefix(&self) -> &'static str;

    /// Framework subtrees shipped in the template archive.
    /// Empty means the archive root is the template itself.
    fn frameworks(&self) -> &'static [&'static str] {
        &[]
    }

    /// Name suggested when prompting for a project name
    fn default_project_name(&self) -> &'static str {
        "my-app"
    }

    /// Base URL for release metadata
    fn api_base_url(&self) -> &'static str {
        "https://api.github.com"
    }

    /// Base URL for tarball downloads
    fn archive_base_url(&self) -> &'static str {
        "https://codeload.github.com"
    }

    /// Base URL for raw files such as `.templateignore`
    fn raw_base_url(&self) -> &'static str {
        "https://raw.githubusercontent.com"
    }

    /// Environment variable that redirects every template endpoint to one mirror
    fn template_url_env(&self) -> String {
        format!("{}_TEMPLATE_URL", self.env_prefix())
    }

    /// How development files are pruned after extraction
    fn cleanup_mode(&self) -> CleanupMode {
        if self.frameworks().is_empty() {
            CleanupMode::ExactNames
        } else {
            CleanupMode::Patterns
        }
    }

    /// Keep/remove rules used by the cleanup engine
    fn cleanup_rules(&self) -> CleanupRules {
        CleanupRules::default()
    }

    /// Generate the "next steps" instructions after project creation
    fn next_steps(&self, summary: &ScaffoldSummary) -> Vec<String>;

    /// User agent string for HTTP requests
    fn user_agent(&self) -> &'static str {
        self.name()
    }
}
