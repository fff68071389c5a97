//! Error taxonomy for the scaffolding pipeline

use std::path::PathBuf;

/// Errors that abort a scaffolding run.
///
/// Per-entry failures inside the cleanup engine and the sanitizer never show up
/// here; they are recorded in the stage reports instead.
#[derive(Debug, thiserror::Error)]
pub enum ScaffoldError {
    #[error("Failed to download {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("Framework '{framework}' not found in template (available: {})", available.join(", "))]
    FrameworkNotFound {
        framework: String,
        available: Vec<String>,
    },

    #[error("Failed to extract template archive: {0}")]
    Extraction(String),

    #[error("Invalid manifest {}: {reason}", path.display())]
    Manifest { path: PathBuf, reason: String },

    #[error("Failed to clean up {}: {source}", path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{manager} install failed: {reason}")]
    Install { manager: String, reason: String },

    #[error("{0}")]
    Validation(String),

    #[error("Directory already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    #[error("Setup cancelled.")]
    Cancelled,

    #[error("Prompt failed: {0}")]
    Prompt(#[source] std::io::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScaffoldError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn extraction(message: impl std::fmt::Display) -> Self {
        Self::Extraction(message.to_string())
    }
}

/// Result type for scaffolding operations.
pub type Result<T> = std::result::Result<T, ScaffoldError>;
