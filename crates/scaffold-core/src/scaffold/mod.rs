//! Pipeline orchestration
//!
//! [`Scaffolder`] drives one run through a fixed sequence of stages. Once the
//! destination is registered with the [`RollbackHandle`], any failure removes it
//! again, so a run leaves either a complete project or nothing.

pub mod prompt;
pub mod rollback;

pub use prompt::{AutoAccept, DestinationAction, Prompter};
pub use rollback::RollbackHandle;

use crate::cleanup::{CleanupEngine, CleanupPlan, CleanupReport};
use crate::config::Settings;
use crate::error::{Result, ScaffoldError};
use crate::product::ProductConfig;
use crate::project::ProjectIdentity;
use crate::runtime::{CommandRunner, PackageManager, PackageManagerAdapter, Probe};
use crate::runtime::{SystemProbe, SystemRunner};
use crate::templates::{
    rewrite_package_name, strip_byte_order_marks, ResolvedReference, SanitizeReport,
    TemplateFetcher,
};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ResolvingName,
    ValidatingName,
    CheckingDestination,
    ResolvingReference,
    Fetching,
    Sanitizing,
    Cleaning,
    RewritingManifest,
    Installing,
    Summarizing,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::ResolvingName => "resolving project name",
            Stage::ValidatingName => "validating project name",
            Stage::CheckingDestination => "checking destination",
            Stage::ResolvingReference => "resolving template version",
            Stage::Fetching => "downloading template",
            Stage::Sanitizing => "sanitizing files",
            Stage::Cleaning => "removing development files",
            Stage::RewritingManifest => "updating package.json",
            Stage::Installing => "installing dependencies",
            Stage::Summarizing => "summarizing",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Everything a successful run produced
#[derive(Debug, Clone)]
pub struct ScaffoldSummary {
    pub identity: ProjectIdentity,
    pub destination: PathBuf,
    pub reference: ResolvedReference,
    pub framework: Option<String>,
    pub include_api_routes: bool,
    pub files_extracted: usize,
    pub sanitized: SanitizeReport,
    /// `None` when cleanup was skipped
    pub cleanup: Option<CleanupReport>,
    pub package_manager: PackageManager,
    /// False when installation was skipped
    pub installed: bool,
}

/// Runs the scaffolding pipeline for one product
pub struct Scaffolder<C, P = SystemProbe, R = SystemRunner> {
    config: C,
    settings: Settings,
    fetcher: TemplateFetcher,
    packages: PackageManagerAdapter<P, R>,
    rollback: RollbackHandle,
    workdir: PathBuf,
}

impl<C: ProductConfig> Scaffolder<C> {
    /// Scaffolder creating projects in the current directory with real package managers
    pub fn new(config: C, settings: Settings, rollback: RollbackHandle) -> Result<Self> {
        let fetcher = TemplateFetcher::from_settings(&config, &settings)?;
        let workdir = std::env::current_dir()?;
        Ok(Self::with_parts(
            config,
            settings,
            fetcher,
            PackageManagerAdapter::system(),
            rollback,
            workdir,
        ))
    }
}

impl<C, P, R> Scaffolder<C, P, R>
where
    C: ProductConfig,
    P: Probe,
    R: CommandRunner,
{
    pub fn with_parts(
        config: C,
        settings: Settings,
        fetcher: TemplateFetcher,
        packages: PackageManagerAdapter<P, R>,
        rollback: RollbackHandle,
        workdir: PathBuf,
    ) -> Self {
        Self {
            config,
            settings,
            fetcher,
            packages,
            rollback,
            workdir,
        }
    }

    /// Run every stage. On failure the destination is rolled back if this run
    /// created it, and the failing stage is reported to `ui`.
    pub async fn run<U: Prompter>(&self, ui: &mut U) -> Result<ScaffoldSummary> {
        let mut stage = Stage::ResolvingName;
        match self.execute(ui, &mut stage).await {
            Ok(summary) => {
                self.rollback.disarm();
                enter(ui, &mut stage, Stage::Done);
                Ok(summary)
            }
            Err(e) => {
                let failed_at = stage;
                enter(ui, &mut stage, Stage::Failed);
                if let Some(path) = self.rollback.rollback() {
                    info!(path = %path.display(), "removed partially created project");
                }
                if !matches!(e, ScaffoldError::Cancelled) {
                    error!(stage = %failed_at, error = %e, "scaffolding failed");
                }
                ui.stage_failed(failed_at, &e.to_string());
                Err(e)
            }
        }
    }

    async fn execute<U: Prompter>(&self, ui: &mut U, stage: &mut Stage) -> Result<ScaffoldSummary> {
        let interactive = !self.settings.auto_accept && ui.is_interactive();

        enter(ui, stage, Stage::ResolvingName);
        let mut raw_name = match &self.settings.project_name {
            Some(name) => name.clone(),
            None if interactive => ui.project_name(self.config.default_project_name())?,
            None => {
                return Err(ScaffoldError::validation(
                    "A project name is required in non-interactive mode",
                ))
            }
        };
        let framework = self.choose_framework(ui, interactive)?;
        let include_api_routes = match self.settings.include_api_routes {
            Some(include) => include,
            None if interactive => ui.include_api_routes()?,
            None => true,
        };

        let (identity, destination) = loop {
            enter(ui, stage, Stage::ValidatingName);
            let identity = ProjectIdentity::new(&raw_name)?;

            enter(ui, stage, Stage::CheckingDestination);
            let destination = self.workdir.join(identity.name());
            if !destination.exists() {
                break (identity, destination);
            }
            if !interactive {
                return Err(ScaffoldError::DestinationExists(destination));
            }
            match ui.destination_exists(&destination)? {
                DestinationAction::Rename(name) => raw_name = name,
                DestinationAction::Abort => return Err(ScaffoldError::Cancelled),
            }
        };

        enter(ui, stage, Stage::ResolvingReference);
        let reference = self
            .fetcher
            .resolve_reference(
                self.settings.reference.as_deref(),
                self.config.fallback_reference(),
            )
            .await;
        if let Some(warning) = reference.warning() {
            ui.warn(&format!("{}. Using {}.", warning, reference.name));
        }
        ui.stage_finished(Stage::ResolvingReference, &format!("Template {}", reference));

        enter(ui, stage, Stage::Fetching);
        self.rollback.arm(&destination);
        let files_extracted = match &framework {
            Some(framework) => {
                self.fetcher
                    .fetch_framework(&reference.name, framework, &destination, &self.rollback)
                    .await?
            }
            None => {
                self.fetcher
                    .fetch_into(&reference.name, &destination, &self.rollback)
                    .await?
            }
        };
        ui.stage_finished(
            Stage::Fetching,
            &format!("Extracted {} files into {}", files_extracted, identity.name()),
        );

        enter(ui, stage, Stage::Sanitizing);
        let sanitized = strip_byte_order_marks(&destination).await;
        for (file, reason) in sanitized.failures() {
            warn!(%file, %reason, "could not sanitize file");
            ui.warn(&format!("Could not check {} for a byte-order mark: {}", file, reason));
        }

        enter(ui, stage, Stage::Cleaning);
        let cleanup = self
            .clean(&destination, &reference, include_api_routes)
            .await?;
        if let Some(report) = &cleanup {
            ui.stage_finished(
                Stage::Cleaning,
                &format!(
                    "Removed {} files and {} folders",
                    report.files_removed, report.folders_removed
                ),
            );
        }

        enter(ui, stage, Stage::RewritingManifest);
        rewrite_package_name(&destination, &identity).await?;

        let (package_manager, installed) = if self.settings.skip_install {
            debug!("skipping dependency installation");
            (self.settings.package_manager.unwrap_or_default(), false)
        } else {
            enter(ui, stage, Stage::Installing);
            let requested = match self.settings.package_manager {
                Some(manager) => manager,
                None => self.packages.detect(self.settings.ci),
            };
            let used = self.packages.install(&destination, requested).await?;
            if used != requested {
                ui.warn(&format!("{} install failed, installed with {} instead", requested, used));
            }
            ui.stage_finished(
                Stage::Installing,
                &format!("Installed dependencies with {}", used),
            );
            (used, true)
        };

        enter(ui, stage, Stage::Summarizing);
        Ok(ScaffoldSummary {
            identity,
            destination,
            reference,
            framework,
            include_api_routes,
            files_extracted,
            sanitized,
            cleanup,
            package_manager,
            installed,
        })
    }

    fn choose_framework<U: Prompter>(&self, ui: &mut U, interactive: bool) -> Result<Option<String>> {
        let frameworks = self.config.frameworks();
        if frameworks.is_empty() {
            return Ok(None);
        }
        if let Some(framework) = &self.settings.framework {
            return Ok(Some(framework.clone()));
        }
        if interactive && frameworks.len() > 1 {
            return ui.framework(frameworks).map(Some);
        }
        Ok(frameworks.first().map(|f| f.to_string()))
    }

    /// Prune development files; with `skip_cleanup` only excluded API routes go
    async fn clean(
        &self,
        destination: &Path,
        reference: &ResolvedReference,
        include_api_routes: bool,
    ) -> Result<Option<CleanupReport>> {
        let rules = self.config.cleanup_rules();
        let engine = CleanupEngine::new(rules.clone(), include_api_routes);

        if self.settings.skip_cleanup {
            debug!("skipping cleanup");
            engine.remove_api_routes(destination, &mut CleanupReport::default());
            return Ok(None);
        }

        let plan =
            CleanupPlan::prepare(self.config.cleanup_mode(), &self.fetcher, &reference.name, &rules)
                .await;
        engine.run(destination, &plan).map(Some)
    }
}

fn enter<U: Prompter>(ui: &mut U, stage: &mut Stage, next: Stage) {
    debug!(from = %stage, to = %next, "stage transition");
    *stage = next;
    ui.stage_started(next);
}
