//! Scaffold Core - Shared library for web project scaffolding CLIs
//!
//! This library turns a template repository into a ready-to-run project. It is
//! designed to be used by CLI binaries (e.g., `create-webapp`) that share the
//! same pipeline but point at different template repositories.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! - **Layer 1: Core Operations** - Reference resolution, archive fetching,
//!   sanitizing, cleanup, manifest rewriting, package manager invocation
//! - **Layer 2: Workflow Orchestration** - `ProductConfig`, `Settings` and the
//!   `Scaffolder` state machine with rollback
//! - **Layer 3: CLI/TUI Interface** - Optional cliclack-based prompts (feature-gated)
//!
//! # Feature Flags
//!
//! - `tui` (default): Enables the cliclack-based TUI prompts module
//!
//! # Example Usage (without TUI)
//!
//! ```ignore
//! use scaffold_core::{AutoAccept, CreateFlags, RollbackHandle, Scaffolder, Settings};
//!
//! let settings = Settings::resolve(&MyConfig, CreateFlags {
//!     project_name: Some("my-app".into()),
//!     yes: true,
//!     ..Default::default()
//! })?;
//! let scaffolder = Scaffolder::new(MyConfig, settings, RollbackHandle::new())?;
//! let summary = scaffolder.run(&mut AutoAccept).await?;
//! ```

pub mod cleanup;
pub mod config;
pub mod error;
pub mod product;
pub mod project;
pub mod runtime;
pub mod scaffold;
pub mod templates;

#[cfg(feature = "tui")]
pub mod tui;

// Re-export main types for convenience
pub use cleanup::{CleanupEngine, CleanupMode, CleanupPlan, CleanupReport, CleanupRules};
pub use config::{CreateFlags, Settings};
pub use error::{Result, ScaffoldError};
pub use product::ProductConfig;
pub use project::ProjectIdentity;
pub use runtime::{PackageManager, PackageManagerAdapter};
pub use scaffold::{
    AutoAccept, DestinationAction, Prompter, RollbackHandle, ScaffoldSummary, Scaffolder, Stage,
};
pub use templates::{ResolvedReference, TemplateFetcher, TemplateSource};

#[cfg(feature = "tui")]
pub use tui::run;
