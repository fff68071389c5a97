//! Package manager selection and dependency installation

use super::check::{Probe, SystemProbe};
use super::command::{CommandRunner, SystemRunner};
use crate::error::{Result, ScaffoldError};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

/// Supported JavaScript package managers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PackageManager {
    #[default]
    Npm,
    Yarn,
    Pnpm,
}

impl PackageManager {
    pub fn name(&self) -> &'static str {
        match self {
            PackageManager::Npm => "npm",
            PackageManager::Yarn => "yarn",
            PackageManager::Pnpm => "pnpm",
        }
    }

    /// Executable name on this platform (Windows ships `.cmd` shims)
    pub fn binary(&self) -> String {
        if cfg!(windows) {
            format!("{}.cmd", self.name())
        } else {
            self.name().to_string()
        }
    }

    pub fn install_args(&self) -> &'static [&'static str] {
        &["install"]
    }

    /// Command line for running a package script
    pub fn run_script(&self, script: &str) -> String {
        match self {
            PackageManager::Npm => format!("npm run {}", script),
            PackageManager::Yarn => format!("yarn {}", script),
            PackageManager::Pnpm => format!("pnpm {}", script),
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PackageManager {
    type Err = ScaffoldError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "npm" => Ok(PackageManager::Npm),
            "yarn" => Ok(PackageManager::Yarn),
            "pnpm" => Ok(PackageManager::Pnpm),
            other => Err(ScaffoldError::validation(format!(
                "Unknown package manager '{}' (expected one of: npm, yarn, pnpm)",
                other
            ))),
        }
    }
}

/// Detects and drives a package manager through injectable probe/run seams
pub struct PackageManagerAdapter<P = SystemProbe, R = SystemRunner> {
    probe: P,
    runner: R,
}

impl PackageManagerAdapter {
    /// Adapter backed by the real host environment
    pub fn system() -> Self {
        Self::new(SystemProbe, SystemRunner)
    }
}

impl<P: Probe, R: CommandRunner> PackageManagerAdapter<P, R> {
    pub fn new(probe: P, runner: R) -> Self {
        Self { probe, runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Pick a manager: pnpm, then yarn, else npm.
    /// CI environments skip probing and always get npm.
    pub fn detect(&self, ci: bool) -> PackageManager {
        if ci {
            debug!("CI environment detected, using npm");
            return PackageManager::Npm;
        }

        for candidate in [PackageManager::Pnpm, PackageManager::Yarn] {
            if self.probe.responds(&candidate.binary()) {
                debug!(manager = %candidate, "package manager detected");
                return candidate;
            }
        }

        PackageManager::Npm
    }

    /// Install dependencies in `dir`, returning the manager that succeeded.
    ///
    /// A failed yarn install is retried once with npm.
    pub async fn install(&self, dir: &Path, manager: PackageManager) -> Result<PackageManager> {
        let reason = match self.attempt(dir, manager).await {
            Ok(()) => return Ok(manager),
            Err(reason) => reason,
        };

        if manager != PackageManager::Yarn {
            return Err(ScaffoldError::Install {
                manager: manager.to_string(),
                reason,
            });
        }

        warn!(%reason, "yarn install failed, retrying with npm");
        match self.attempt(dir, PackageManager::Npm).await {
            Ok(()) => Ok(PackageManager::Npm),
            Err(npm_reason) => Err(ScaffoldError::Install {
                manager: manager.to_string(),
                reason: format!("{}; npm fallback also failed: {}", reason, npm_reason),
            }),
        }
    }

    async fn attempt(&self, dir: &Path, manager: PackageManager) -> std::result::Result<(), String> {
        debug!(manager = %manager, dir = %dir.display(), "running install");
        match self
            .runner
            .run(&manager.binary(), manager.install_args(), dir)
            .await
        {
            Ok(true) => Ok(()),
            Ok(false) => Err(format!("`{} install` exited with a non-zero status", manager)),
            Err(e) => Err(format!("could not start {}: {}", manager, e)),
        }
    }
}
