//! Package manager detection and dependency installation
//!
//! This module provides:
//! - Binary probing (`Probe`) and command execution (`CommandRunner`) seams
//! - Package manager selection and install with yarn -> npm fallback

pub mod check;
pub mod command;
pub mod package_manager;

pub use check::{Probe, SystemProbe};
pub use command::{CommandRunner, SystemRunner};
pub use package_manager::{PackageManager, PackageManagerAdapter};
