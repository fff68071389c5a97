//! create-webapp - Project scaffolding for web applications

use anyhow::Result;
use clap::Parser;
use scaffold_core::{CreateFlags, ProductConfig, RollbackHandle, ScaffoldError, ScaffoldSummary};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Exit code used when the user interrupts the run
const EXIT_INTERRUPTED: u8 = 130;

/// create-webapp product configuration
#[derive(Clone)]
pub struct WebappConfig;

impl ProductConfig for WebappConfig {
    fn name(&self) -> &'static str {
        "create-webapp"
    }

    fn display_name(&self) -> &'static str {
        "create-webapp"
    }

    fn template_repo(&self) -> &'static str {
        "create-webapp/templates"
    }

    fn fallback_reference(&self) -> &'static str {
        "v1.0.0"
    }

    fn env_prefix(&self) -> &'static str {
        "CREATE_WEBAPP"
    }

    fn frameworks(&self) -> &'static [&'static str] {
        &["react", "vue", "svelte"]
    }

    fn next_steps(&self, summary: &ScaffoldSummary) -> Vec<String> {
        let manager = summary.package_manager;
        let mut steps = vec![format!("cd {}", summary.identity.name())];

        if !summary.installed {
            steps.push(format!("{} install", manager));
        }
        steps.push(manager.run_script("dev"));
        steps.push("Open README.md to get started".to_string());

        steps
    }
}

#[derive(Parser, Debug)]
#[command(name = "create-webapp")]
#[command(about = "CLI for scaffolding web application projects")]
#[command(version)]
pub struct Args {
    /// Project name (also the directory to create)
    pub name: Option<String>,

    /// Template tag, branch or commit (defaults to the latest release)
    #[arg(long = "ref", value_name = "REF")]
    pub reference: Option<String>,

    /// Framework template to use
    #[arg(short, long)]
    pub framework: Option<String>,

    /// Package manager to install dependencies with
    #[arg(long, value_parser = ["npm", "yarn", "pnpm"])]
    pub package_manager: Option<String>,

    /// Include API routes
    #[arg(long, conflicts_with = "no_api")]
    pub api: bool,

    /// Exclude API routes
    #[arg(long = "no-api")]
    pub no_api: bool,

    /// Auto-confirm all prompts (non-interactive mode)
    #[arg(short, long)]
    pub yes: bool,

    /// Keep development files shipped with the template
    #[arg(long)]
    pub skip_cleanup: bool,

    /// Do not install dependencies
    #[arg(long)]
    pub skip_install: bool,

    /// Local directory to use for templates instead of fetching from remote (for development use)
    #[arg(long = "template-dir", hide = true)]
    pub template_dir: Option<PathBuf>,
}

impl From<Args> for CreateFlags {
    fn from(args: Args) -> Self {
        CreateFlags {
            project_name: args.name,
            reference: args.reference,
            framework: args.framework,
            package_manager: args.package_manager,
            api: args.api,
            no_api: args.no_api,
            yes: args.yes,
            skip_cleanup: args.skip_cleanup,
            skip_install: args.skip_install,
            template_dir: args.template_dir,
        }
    }
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {}", e))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Ensure terminal cursor is restored on panic
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = console::Term::stderr().show_cursor();
        default_panic(info);
    }));

    // Usage errors exit with code 2 before anything is created
    let args = Args::parse();
    init_logging()?;

    // Handle Ctrl+C: remove a half-created project and its scratch directory, then exit.
    // Destructors do not run after `process::exit`, so the handle owns that cleanup.
    let rollback = RollbackHandle::new();
    let on_interrupt = rollback.clone();
    ctrlc::set_handler(move || {
        on_interrupt.rollback();
        let _ = console::Term::stderr().show_cursor();
        std::process::exit(i32::from(EXIT_INTERRUPTED));
    })
    .ok();

    let result = scaffold_core::run(&WebappConfig, args.into(), rollback).await;

    // Ensure cursor is visible on normal exit
    let _ = console::Term::stderr().show_cursor();

    match result {
        Ok(summary) => {
            tracing::debug!(project = %summary.identity, "project created");
            Ok(ExitCode::SUCCESS)
        }
        Err(ScaffoldError::Cancelled) => Ok(ExitCode::from(EXIT_INTERRUPTED)),
        Err(e) => {
            tracing::debug!(error = ?e, "run failed");
            Ok(ExitCode::FAILURE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use scaffold_core::runtime::PackageManager;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_api_flags_conflict() {
        let err = Args::try_parse_from(["create-webapp", "app", "--api", "--no-api"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_unknown_package_manager_rejected() {
        let err = Args::try_parse_from(["create-webapp", "app", "--package-manager", "bun"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }

    #[test]
    fn test_args_map_to_flags() {
        let args = Args::try_parse_from([
            "create-webapp",
            "My Shop",
            "--ref",
            "v2.0.0",
            "--framework",
            "vue",
            "--no-api",
            "-y",
            "--skip-install",
        ])
        .unwrap();
        let flags: CreateFlags = args.into();
        assert_eq!(flags.project_name.as_deref(), Some("My Shop"));
        assert_eq!(flags.reference.as_deref(), Some("v2.0.0"));
        assert_eq!(flags.framework.as_deref(), Some("vue"));
        assert!(flags.no_api && !flags.api);
        assert!(flags.yes && flags.skip_install && !flags.skip_cleanup);
    }

    #[test]
    fn test_run_script_for_next_steps() {
        assert_eq!(PackageManager::Pnpm.run_script("dev"), "pnpm dev");
        assert_eq!(PackageManager::Npm.run_script("dev"), "npm run dev");
    }
}
