//! Project manifest (package.json) rewriting

use crate::error::{Result, ScaffoldError};
use crate::project::ProjectIdentity;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Manifest file name inside the generated project
pub const MANIFEST_FILE: &str = "package.json";

/// Set the manifest's `name` to the project identity and rewrite it with
/// two-space indentation and a trailing newline.
pub async fn rewrite_package_name(dir: &Path, identity: &ProjectIdentity) -> Result<PathBuf> {
    let path = dir.join(MANIFEST_FILE);
    let manifest_error = |reason: String| ScaffoldError::Manifest {
        path: path.clone(),
        reason,
    };

    let bytes = fs::read(&path)
        .await
        .map_err(|e| manifest_error(e.to_string()))?;
    let content = String::from_utf8(bytes).map_err(|e| manifest_error(e.to_string()))?;
    let rewritten = set_package_name(&content, identity.name()).map_err(manifest_error)?;

    fs::write(&path, rewritten)
        .await
        .map_err(|e| manifest_error(e.to_string()))?;
    Ok(path)
}

/// Replace (or insert) the `name` field, preserving every other field and its order
pub fn set_package_name(content: &str, name: &str) -> std::result::Result<String, String> {
    let content = content.trim_start_matches('\u{feff}');
    let mut manifest: Value = serde_json::from_str(content).map_err(|e| e.to_string())?;

    let object = manifest
        .as_object_mut()
        .ok_or_else(|| "expected a JSON object at the top level".to_string())?;
    object.insert("name".to_string(), Value::String(name.to_string()));

    let mut rendered = serde_json::to_string_pretty(&manifest).map_err(|e| e.to_string())?;
    rendered.push('\n');
    Ok(rendered)
}
