//! Subprocess execution for package manager commands

use std::future::Future;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command as TokioCommand;

/// Runs a program to completion inside a working directory.
///
/// Resolves to `Ok(true)` when the program exits successfully, `Ok(false)` on a
/// non-zero exit, and `Err` when it could not be started.
pub trait CommandRunner: Send + Sync {
    fn run(
        &self,
        program: &str,
        args: &[&str],
        dir: &Path,
    ) -> impl Future<Output = std::io::Result<bool>> + Send;
}

/// Runner that spawns real processes with output suppressed
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[&str], dir: &Path) -> std::io::Result<bool> {
        let status = TokioCommand::new(program)
            .args(args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await?;
        Ok(status.success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_program_is_an_error() {
        let dir = std::env::temp_dir();
        let result = SystemRunner
            .run("definitely-not-a-real-binary-4c1f", &["install"], &dir)
            .await;
        assert!(result.is_err());
    }
}
