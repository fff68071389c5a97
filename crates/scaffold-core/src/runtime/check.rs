//! Binary availability checks

use std::process::{Command, Stdio};

/// Answers whether a program is installed and responds to `--version`
pub trait Probe: Send + Sync {
    fn responds(&self, program: &str) -> bool;
}

/// Probe that spawns the real binary
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

impl Probe for SystemProbe {
    fn responds(&self, program: &str) -> bool {
        Command::new(program)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .is_ok_and(|output| output.status.success())
    }
}

/// Get a binary's reported version (if it responds)
pub fn version_of(program: &str) -> Option<String> {
    Command::new(program)
        .arg("--version")
        .stdin(Stdio::null())
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                String::from_utf8(output.stdout)
                    .ok()
                    .map(|s| s.trim().to_string())
            } else {
                None
            }
        })
}
