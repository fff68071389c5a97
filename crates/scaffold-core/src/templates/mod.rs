//! Template acquisition and project materialization
//!
//! This module provides:
//! - Reference resolution (explicit, latest release, fallback)
//! - Streamed archive download and extraction from remote or local sources
//! - Framework subtree selection for multi-template archives
//! - Byte-order-mark sanitizing and manifest rewriting

pub mod fetcher;
pub mod manifest;
pub mod reference;
pub mod sanitize;
pub mod selector;

pub use fetcher::{extract_tar_gz, RemoteEndpoints, TemplateFetcher, TemplateSource};
pub use manifest::{rewrite_package_name, MANIFEST_FILE};
pub use reference::{ReferenceSource, ReferenceWarning, ResolvedReference};
pub use sanitize::{strip_byte_order_marks, SanitizeOutcome, SanitizeReport};
pub use selector::copy_tree;
