//! Run configuration resolved once at start-up
//!
//! Precedence is flags, then environment, then defaults. The resulting
//! [`Settings`] value is passed explicitly through the pipeline; nothing below
//! this module reads the environment.

use crate::error::{Result, ScaffoldError};
use crate::product::ProductConfig;
use crate::runtime::PackageManager;
use std::path::PathBuf;
use url::Url;

/// Environment variables that indicate a continuous-integration host
const CI_VARS: &[&str] = &[
    "CI",
    "CONTINUOUS_INTEGRATION",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "BUILDKITE",
    "CIRCLECI",
    "TRAVIS",
    "TF_BUILD",
    "JENKINS_URL",
];

/// Raw command-line input, before environment and defaults are applied
#[derive(Debug, Clone, Default)]
pub struct CreateFlags {
    /// Project name (positional argument)
    pub project_name: Option<String>,

    /// Template tag, branch or commit
    pub reference: Option<String>,

    /// Framework subtree to scaffold
    pub framework: Option<String>,

    /// Package manager to install with
    pub package_manager: Option<String>,

    /// Include API routes
    pub api: bool,

    /// Exclude API routes
    pub no_api: bool,

    /// Auto-confirm all prompts (non-interactive mode)
    pub yes: bool,

    /// Keep development files from the template
    pub skip_cleanup: bool,

    /// Do not run the package manager
    pub skip_install: bool,

    /// Local directory to use for templates instead of fetching from remote
    pub template_dir: Option<PathBuf>,
}

/// Fully resolved configuration for one run
#[derive(Debug, Clone)]
pub struct Settings {
    pub project_name: Option<String>,
    pub reference: Option<String>,
    /// Canonical framework name, when chosen by flag or environment
    pub framework: Option<String>,
    pub package_manager: Option<PackageManager>,
    /// `None` means "ask, or default to included"
    pub include_api_routes: Option<bool>,
    pub auto_accept: bool,
    pub skip_cleanup: bool,
    pub skip_install: bool,
    pub template_dir: Option<PathBuf>,
    /// Mirror replacing every remote template endpoint
    pub template_url: Option<Url>,
    pub ci: bool,
}

impl Settings {
    /// Resolve settings against the process environment
    pub fn resolve<C: ProductConfig>(config: &C, flags: CreateFlags) -> Result<Self> {
        Self::resolve_with(config, flags, |key| std::env::var(key).ok())
    }

    /// Resolve settings with an injectable environment lookup
    pub fn resolve_with<C, F>(config: &C, flags: CreateFlags, lookup: F) -> Result<Self>
    where
        C: ProductConfig,
        F: Fn(&str) -> Option<String>,
    {
        let env = |suffix: &str| -> Option<(String, String)> {
            let key = format!("{}_{}", config.env_prefix(), suffix);
            lookup(&key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .map(|value| (key, value))
        };

        let include_api_routes = match (flags.api, flags.no_api) {
            (true, true) => {
                return Err(ScaffoldError::validation(
                    "--api and --no-api cannot be used together",
                ))
            }
            (true, false) => Some(true),
            (false, true) => Some(false),
            (false, false) => match env("API") {
                Some((key, value)) => Some(parse_bool(&key, &value)?),
                None => None,
            },
        };

        let framework = match flags.framework {
            Some(value) => Some(canonical_framework(config, "--framework", &value)?),
            None => match env("FRAMEWORK") {
                Some((key, value)) => Some(canonical_framework(config, &key, &value)?),
                None => None,
            },
        };

        let package_manager = match flags.package_manager {
            Some(value) => Some(value.parse::<PackageManager>()?),
            None => match env("PACKAGE_MANAGER") {
                Some((_, value)) => Some(value.parse::<PackageManager>()?),
                None => None,
            },
        };

        let auto_accept = if flags.yes {
            true
        } else {
            match env("YES") {
                Some((key, value)) => parse_bool(&key, &value)?,
                None => false,
            }
        };

        let template_url = match lookup(&config.template_url_env()) {
            Some(value) if !value.trim().is_empty() => {
                let parsed = Url::parse(value.trim()).map_err(|e| {
                    ScaffoldError::validation(format!(
                        "Invalid template URL in {}: {}",
                        config.template_url_env(),
                        e
                    ))
                })?;
                Some(parsed)
            }
            _ => None,
        };

        Ok(Self {
            project_name: flags.project_name.filter(|n| !n.trim().is_empty()),
            reference: flags.reference.filter(|r| !r.trim().is_empty()),
            framework,
            package_manager,
            include_api_routes,
            auto_accept,
            skip_cleanup: flags.skip_cleanup,
            skip_install: flags.skip_install,
            template_dir: flags.template_dir,
            template_url,
            ci: is_ci(&lookup),
        })
    }
}

/// Parse a boolean environment value
fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "no" | "n" | "off" => Ok(false),
        _ => Err(ScaffoldError::validation(format!(
            "Invalid value '{}' for {} (expected true or false)",
            value, key
        ))),
    }
}

/// Match a framework name against the product's list, case-insensitively
fn canonical_framework<C: ProductConfig>(config: &C, origin: &str, value: &str) -> Result<String> {
    let frameworks = config.frameworks();
    if frameworks.is_empty() {
        return Err(ScaffoldError::validation(format!(
            "{} was given but {} has no framework variants",
            origin,
            config.display_name()
        )));
    }

    frameworks
        .iter()
        .find(|f| f.eq_ignore_ascii_case(value.trim()))
        .map(|f| f.to_string())
        .ok_or_else(|| {
            ScaffoldError::validation(format!(
                "Unknown framework '{}' in {} (expected one of: {})",
                value,
                origin,
                frameworks.join(", ")
            ))
        })
}

fn is_ci<F: Fn(&str) -> Option<String>>(lookup: &F) -> bool {
    CI_VARS.iter().any(|key| match lookup(key) {
        Some(value) => {
            let value = value.trim().to_ascii_lowercase();
            !value.is_empty() && value != "false" && value != "0"
        }
        None => false,
    })
}
