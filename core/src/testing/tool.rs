use std::{path::PathBuf, process::Stdio};

use anyhow::Context as _;
use async_trait::async_trait;
use tokio::process::Command;

/// Captured result of an external collaborator command (build tool etc.).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutcome {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Capability seam for the build and debugger collaborators, so the session
/// controller depends on an interface rather than on concrete external tools.
#[async_trait]
pub trait ExternalTool {
    /// Runs a command with stdout/stderr captured.
    async fn run_captured(&self, command: &str) -> anyhow::Result<ToolOutcome>;

    /// Runs a command with inherited stdio, for interactive tools.
    /// Returns the exit code (`None` if terminated by signal).
    async fn run_interactive(&self, command: &str) -> anyhow::Result<Option<i32>>;
}

/// The real thing: `shell -c <command>`.
#[derive(Debug, Clone)]
pub struct ShellTool {
    shell: PathBuf,
}

impl ShellTool {
    pub fn new(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

#[async_trait]
impl ExternalTool for ShellTool {
    async fn run_captured(&self, command: &str) -> anyhow::Result<ToolOutcome> {
        let out = Command::new(&self.shell)
            .args(["-c", command])
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| {
                format!(
                    "Failed to spawn '{} -c {}'",
                    self.shell.to_string_lossy(),
                    command
                )
            })?;
        Ok(ToolOutcome {
            status: out.status.code(),
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        })
    }

    async fn run_interactive(&self, command: &str) -> anyhow::Result<Option<i32>> {
        let status = Command::new(&self.shell)
            .args(["-c", command])
            .status()
            .await
            .with_context(|| {
                format!(
                    "Failed to spawn '{} -c {}'",
                    self.shell.to_string_lossy(),
                    command
                )
            })?;
        Ok(status.code())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn captured_run_reports_status_and_output() {
        let tool = ShellTool::new("/bin/sh");
        let out = tool.run_captured("printf 'built'; exit 0").await.unwrap();
        assert!(out.success());
        assert_eq!(out.stdout, "built");
    }

    #[tokio::test]
    async fn captured_run_reports_failure_status() {
        let tool = ShellTool::new("/bin/sh");
        let out = tool
            .run_captured("printf 'boom' >&2; exit 2")
            .await
            .unwrap();
        assert!(!out.success());
        assert_eq!(out.status, Some(2));
        assert_eq!(out.stderr, "boom");
    }
}
