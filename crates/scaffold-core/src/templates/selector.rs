//! Framework subtree selection for multi-template archives
//!
//! The archive is staged in a scratch directory beside the destination, the
//! selected framework's subtree is copied over, and the scratch directory is
//! removed on every exit path: by its own `Drop`, or by the rollback handle
//! when the process is interrupted.

use super::fetcher::TemplateFetcher;
use crate::error::{Result, ScaffoldError};
use crate::scaffold::RollbackHandle;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A staging directory deleted when dropped
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
    rollback: RollbackHandle,
}

impl ScratchDir {
    /// Create `.<dest-name>-scratch-<millis>` next to `dest`, registered with
    /// `rollback` so an interrupt removes it too
    pub fn beside(dest: &Path, rollback: &RollbackHandle) -> Result<Self> {
        let parent = match dest.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string());
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();

        let path = parent.join(format!(".{}-scratch-{}", name, millis));
        rollback.create_scratch(&path)?;
        debug!(path = %path.display(), "created scratch directory");
        Ok(Self {
            path,
            rollback: rollback.clone(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        self.rollback.release_scratch(&self.path);
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "failed to remove scratch directory");
            }
        }
    }
}

impl TemplateFetcher {
    /// Fetch the archive and materialize only `framework`'s subtree in `dest`.
    ///
    /// Returns the number of files copied.
    pub async fn fetch_framework(
        &self,
        reference: &str,
        framework: &str,
        dest: &Path,
        rollback: &RollbackHandle,
    ) -> Result<usize> {
        let scratch = ScratchDir::beside(dest, rollback)?;
        self.fetch_into(reference, scratch.path(), rollback).await?;

        let subtree = scratch.path().join(framework);
        if !subtree.is_dir() {
            return Err(ScaffoldError::FrameworkNotFound {
                framework: framework.to_string(),
                available: list_subdirectories(scratch.path()),
            });
        }

        {
            let _guard = rollback.hold()?;
            std::fs::create_dir_all(dest)?;
        }
        copy_tree(&subtree, dest, rollback)
    }
}

/// Recursively copy directories and regular files from `source` into `dest`
pub fn copy_tree(source: &Path, dest: &Path, rollback: &RollbackHandle) -> Result<usize> {
    let mut copied = 0;

    for entry in WalkDir::new(source).min_depth(1) {
        let entry = entry.map_err(|e| ScaffoldError::Io(e.into()))?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(ScaffoldError::extraction)?;
        let target = dest.join(relative);

        let file_type = entry.file_type();
        let _guard = rollback.hold()?;
        if file_type.is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if file_type.is_file() {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }

    Ok(copied)
}

fn list_subdirectories(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::super::fetcher::test_support::write_tarball;
    use super::*;

    fn mirror_with_frameworks() -> tempfile::TempDir {
        let mirror = tempfile::tempdir().unwrap();
        write_tarball(
            mirror.path(),
            "v1.0.0",
            "templates-1.0.0",
            &[
                ("react/package.json", b"{\"name\":\"react-starter\"}"),
                ("react/src/App.tsx", b"export default 1;"),
                ("vue/package.json", b"{\"name\":\"vue-starter\"}"),
                ("README.md", b"# Monorepo"),
            ],
        );
        mirror
    }

    fn scratch_dirs(parent: &Path) -> Vec<String> {
        std::fs::read_dir(parent)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.contains("-scratch-"))
            .collect()
    }

    #[tokio::test]
    async fn test_fetch_framework_copies_subtree() {
        let mirror = mirror_with_frameworks();
        let work = tempfile::tempdir().unwrap();
        let dest = work.path().join("my-app");
        let fetcher =
            TemplateFetcher::from_local(mirror.path().to_path_buf(), "acme/templates", "test")
                .unwrap();

        let copied = fetcher
            .fetch_framework("v1.0.0", "react", &dest, &RollbackHandle::new())
            .await
            .unwrap();

        assert_eq!(copied, 2);
        assert!(dest.join("package.json").is_file());
        assert!(dest.join("src/App.tsx").is_file());
        assert!(!dest.join("react").exists());
        assert!(!dest.join("README.md").exists());
        assert!(scratch_dirs(work.path()).is_empty());
    }

    #[tokio::test]
    async fn test_missing_framework_cleans_scratch() {
        let mirror = mirror_with_frameworks();
        let work = tempfile::tempdir().unwrap();
        let dest = work.path().join("my-app");
        let fetcher =
            TemplateFetcher::from_local(mirror.path().to_path_buf(), "acme/templates", "test")
                .unwrap();

        let err = fetcher
            .fetch_framework("v1.0.0", "svelte", &dest, &RollbackHandle::new())
            .await
            .unwrap_err();

        match err {
            ScaffoldError::FrameworkNotFound {
                framework,
                available,
            } => {
                assert_eq!(framework, "svelte");
                assert_eq!(available, vec!["react".to_string(), "vue".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(scratch_dirs(work.path()).is_empty());
    }

    #[test]
    fn test_scratch_dir_removed_on_drop() {
        let work = tempfile::tempdir().unwrap();
        let path = {
            let scratch =
                ScratchDir::beside(&work.path().join("app"), &RollbackHandle::new()).unwrap();
            std::fs::write(scratch.path().join("file.txt"), "x").unwrap();
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_interrupt_removes_live_scratch_dir() {
        let work = tempfile::tempdir().unwrap();
        let dest = work.path().join("app");
        let rollback = RollbackHandle::new();
        rollback.arm(&dest);

        let scratch = ScratchDir::beside(&dest, &rollback).unwrap();
        std::fs::write(scratch.path().join("partial.tar.gz"), "x").unwrap();

        // What the Ctrl-C handler does before exiting without running destructors
        rollback.clone().rollback();

        assert!(!scratch.path().exists());
        assert!(scratch_dirs(work.path()).is_empty());
        std::mem::forget(scratch);
    }

    #[test]
    fn test_copy_tree_stops_after_rollback() {
        let work = tempfile::tempdir().unwrap();
        let source = work.path().join("source");
        std::fs::create_dir_all(&source).unwrap();
        std::fs::write(source.join("index.js"), "x").unwrap();
        let dest = work.path().join("app");

        let rollback = RollbackHandle::new();
        rollback.rollback();

        let err = copy_tree(&source, &dest, &rollback).unwrap_err();
        assert!(matches!(err, ScaffoldError::Cancelled));
        assert!(!dest.join("index.js").exists());
    }
}
