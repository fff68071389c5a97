//! Charm-style CLI prompts using cliclack

use crate::config::{CreateFlags, Settings};
use crate::error::{Result, ScaffoldError};
use crate::product::ProductConfig;
use crate::project::ProjectIdentity;
use crate::runtime::check::version_of;
use crate::scaffold::{
    DestinationAction, Prompter, RollbackHandle, ScaffoldSummary, Scaffolder, Stage,
};
use cliclack::ProgressBar;
use colored::Colorize;
use std::path::Path;

/// Removed paths listed in the summary before collapsing into a count
const REMOVED_PREVIEW_LIMIT: usize = 10;

fn prompt_error(e: std::io::Error) -> ScaffoldError {
    if e.kind() == std::io::ErrorKind::Interrupted {
        ScaffoldError::Cancelled
    } else {
        ScaffoldError::Prompt(e)
    }
}

#[allow(clippy::ptr_arg)]
fn validate_name(input: &String) -> std::result::Result<(), String> {
    ProjectIdentity::new(input).map(|_| ()).map_err(|e| e.to_string())
}

/// Prompter backed by cliclack, with one spinner per long-running stage
#[derive(Default)]
pub struct ClackPrompter {
    spinner: Option<(Stage, ProgressBar)>,
    deferred: Vec<String>,
}

impl ClackPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    fn uses_spinner(stage: Stage) -> bool {
        matches!(
            stage,
            Stage::ResolvingReference | Stage::Fetching | Stage::Cleaning | Stage::Installing
        )
    }

    fn stop_spinner(&mut self, message: Option<&str>) {
        if let Some((stage, spinner)) = self.spinner.take() {
            let fallback = stage.to_string();
            spinner.stop(message.unwrap_or(&fallback));
        }
        // Warnings raised while a spinner was animating are printed once it stops
        for warning in self.deferred.drain(..) {
            let _ = cliclack::log::warning(warning);
        }
    }
}

impl Prompter for ClackPrompter {
    fn is_interactive(&self) -> bool {
        console::user_attended()
    }

    fn project_name(&mut self, default: &str) -> Result<String> {
        cliclack::input("Project name")
            .placeholder(default)
            .default_input(default)
            .validate(validate_name)
            .interact()
            .map_err(prompt_error)
    }

    fn framework(&mut self, frameworks: &[&str]) -> Result<String> {
        let mut select = cliclack::select("Select a framework");
        for framework in frameworks {
            select = select.item(framework.to_string(), framework, "");
        }
        select.interact().map_err(prompt_error)
    }

    fn include_api_routes(&mut self) -> Result<bool> {
        cliclack::confirm("Include API routes?")
            .initial_value(true)
            .interact()
            .map_err(prompt_error)
    }

    fn destination_exists(&mut self, path: &Path) -> Result<DestinationAction> {
        cliclack::log::warning(format!("Directory already exists: {}", path.display()))
            .map_err(prompt_error)?;

        let action: &str = cliclack::select("What would you like to do?")
            .item("rename", "Choose a different project name", "")
            .item("abort", "Cancel setup", "")
            .interact()
            .map_err(prompt_error)?;

        match action {
            "rename" => cliclack::input("Project name")
                .validate(validate_name)
                .interact()
                .map(DestinationAction::Rename)
                .map_err(prompt_error),
            _ => Ok(DestinationAction::Abort),
        }
    }

    fn stage_started(&mut self, stage: Stage) {
        self.stop_spinner(None);
        if Self::uses_spinner(stage) {
            let spinner = cliclack::spinner();
            spinner.start(format!("{}...", capitalize(&stage.to_string())));
            self.spinner = Some((stage, spinner));
        }
    }

    fn stage_finished(&mut self, stage: Stage, detail: &str) {
        if matches!(&self.spinner, Some((current, _)) if *current == stage) {
            self.stop_spinner(Some(detail));
        } else {
            let _ = cliclack::log::success(detail);
        }
    }

    // The error itself is reported by the outro
    fn stage_failed(&mut self, stage: Stage, _error: &str) {
        if let Some((_, spinner)) = self.spinner.take() {
            spinner.error(format!("Failed while {}", stage));
        }
        self.stop_spinner(None);
    }

    fn warn(&mut self, message: &str) {
        if self.spinner.is_some() {
            self.deferred.push(message.to_string());
        } else {
            let _ = cliclack::log::warning(message);
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Run the CLI with interactive prompts
pub async fn run<C: ProductConfig>(
    config: &C,
    flags: CreateFlags,
    rollback: RollbackHandle,
) -> Result<ScaffoldSummary> {
    cliclack::intro(config.display_name()).map_err(prompt_error)?;

    match create(config, flags, rollback).await {
        Ok(summary) => {
            print_summary(config, &summary).map_err(prompt_error)?;
            Ok(summary)
        }
        Err(e) => {
            let message = match &e {
                ScaffoldError::Cancelled => e.to_string(),
                other => format!("Failed to create project: {}", other),
            };
            let _ = cliclack::outro_cancel(message);
            Err(e)
        }
    }
}

async fn create<C: ProductConfig>(
    config: &C,
    flags: CreateFlags,
    rollback: RollbackHandle,
) -> Result<ScaffoldSummary> {
    let settings = Settings::resolve(config, flags)?;

    if let Some(dir) = &settings.template_dir {
        cliclack::log::info(format!("Using local templates from {}", dir.display()))
            .map_err(prompt_error)?;
    } else if let Some(mirror) = &settings.template_url {
        cliclack::log::info(format!("Using template mirror {}", mirror)).map_err(prompt_error)?;
    }
    if settings.auto_accept {
        cliclack::log::info("Non-interactive mode: using defaults").map_err(prompt_error)?;
    }

    let scaffolder = Scaffolder::new(config.clone(), settings, rollback)?;
    let mut ui = ClackPrompter::new();
    scaffolder.run(&mut ui).await
}

fn print_summary<C: ProductConfig>(config: &C, summary: &ScaffoldSummary) -> std::io::Result<()> {
    if let Some(report) = &summary.cleanup {
        if report.total_removed() > 0 {
            let (shown, more) = report.preview(REMOVED_PREVIEW_LIMIT);
            let mut lines: Vec<String> = shown
                .iter()
                .map(|path| format!("{} {}", "-".dimmed(), path))
                .collect();
            if more > 0 {
                lines.push(format!("... and {} more", more).dimmed().to_string());
            }
            let source = report
                .pattern_source
                .as_ref()
                .map(|s| format!(" ({})", s))
                .unwrap_or_default();
            cliclack::note(
                format!(
                    "Removed {} files and {} folders{}",
                    report.files_removed, report.folders_removed, source
                ),
                lines.join("\n"),
            )?;
        }
        if !report.failed.is_empty() {
            cliclack::log::warning(format!(
                "{} development files could not be removed",
                report.failed.len()
            ))?;
        }
    }

    if summary.installed {
        let manager = summary.package_manager;
        let version = version_of(&manager.binary())
            .map(|v| format!(" ({})", v))
            .unwrap_or_default();
        cliclack::log::success(format!("Dependencies installed with {}{}", manager, version))?;
    }

    let steps = config.next_steps(summary);

    println!();
    println!("  {}", "Next steps".bold());
    println!();

    for (i, step) in steps.iter().enumerate() {
        println!("  {}.  {}", i + 1, step.cyan());
    }
    println!();

    cliclack::outro(format!(
        "Created {} {}",
        summary.identity.name().bold(),
        format!("from {}", summary.reference).dimmed()
    ))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupted_prompt_is_cancellation() {
        let err = prompt_error(std::io::Error::new(std::io::ErrorKind::Interrupted, "ctrl-c"));
        assert!(matches!(err, ScaffoldError::Cancelled));

        let err = prompt_error(std::io::Error::other("tty closed"));
        assert!(matches!(err, ScaffoldError::Prompt(_)));
    }

    #[test]
    fn test_name_validation_message() {
        assert!(validate_name(&"My App".to_string()).is_ok());
        assert!(validate_name(&"   ".to_string()).is_err());
        assert!(validate_name(&"node_modules".to_string()).is_err());
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("downloading template"), "Downloading template");
        assert_eq!(capitalize(""), "");
    }
}
