//! Presentation seam between the orchestrator and a user interface

use super::Stage;
use crate::error::Result;
use std::path::Path;

/// What to do when the destination already exists
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationAction {
    /// Try again with a different project name
    Rename(String),
    Abort,
}

/// Questions and progress notifications the orchestrator needs from a UI.
///
/// Prompt methods are only called when [`Prompter::is_interactive`] is true.
pub trait Prompter {
    fn is_interactive(&self) -> bool;

    fn project_name(&mut self, default: &str) -> Result<String>;

    /// Pick one of `frameworks` (never empty)
    fn framework(&mut self, frameworks: &[&str]) -> Result<String>;

    fn include_api_routes(&mut self) -> Result<bool>;

    fn destination_exists(&mut self, path: &Path) -> Result<DestinationAction>;

    fn stage_started(&mut self, _stage: Stage) {}

    fn stage_finished(&mut self, _stage: Stage, _detail: &str) {}

    fn stage_failed(&mut self, _stage: Stage, _error: &str) {}

    fn warn(&mut self, _message: &str) {}
}

/// Non-interactive prompter used with `--yes`, in CI, and in tests
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoAccept;

impl Prompter for AutoAccept {
    fn is_interactive(&self) -> bool {
        false
    }

    fn project_name(&mut self, default: &str) -> Result<String> {
        Ok(default.to_string())
    }

    fn framework(&mut self, frameworks: &[&str]) -> Result<String> {
        Ok(frameworks.first().map(|f| f.to_string()).unwrap_or_default())
    }

    fn include_api_routes(&mut self) -> Result<bool> {
        Ok(true)
    }

    fn destination_exists(&mut self, _path: &Path) -> Result<DestinationAction> {
        Ok(DestinationAction::Abort)
    }
}
