use std::{path::PathBuf, process::Stdio, time::Duration};

use tokio::process::Command;

use super::result::{ExecutionOutcome, RunOutcome};

/// Failure to launch or communicate with the child process itself.
/// Never raised for the command merely exiting non-zero.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("Failed to spawn '{shell} -c {command}': {source}")]
    Spawn {
        shell: String,
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open {0} pipe of subprocess")]
    Pipe(&'static str),

    #[error("Failed to communicate with subprocess: {0}")]
    Capture(#[source] std::io::Error),
}

/// Runs one command through the shell with no inherited stdin, capturing
/// stdout and stderr in full. Interpretation of the output is the caller's job.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    shell: PathBuf,
    time_limit: Option<Duration>,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRunner {
    pub const DEFAULT_SHELL: &str = "/bin/sh";

    pub fn new() -> Self {
        Self {
            shell: Self::DEFAULT_SHELL.into(),
            time_limit: None,
        }
    }

    pub fn shell(mut self, shell: impl Into<PathBuf>) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn time_limit(mut self, limit: Option<Duration>) -> Self {
        self.time_limit = limit;
        self
    }

    pub fn get_time_limit(&self) -> Option<Duration> {
        self.time_limit
    }

    pub async fn run(&self, command: &str) -> Result<RunOutcome, RunnerError> {
        let mut proc = Command::new(&self.shell)
            .args(["-c", command])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RunnerError::Spawn {
                shell: self.shell.to_string_lossy().into_owned(),
                command: command.to_owned(),
                source: e,
            })?;
        let mut stdout = proc.stdout.take().ok_or(RunnerError::Pipe("stdout"))?;
        let mut stderr = proc.stderr.take().ok_or(RunnerError::Pipe("stderr"))?;

        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();

        let start_at = tokio::time::Instant::now();
        let res = {
            let work = async {
                tokio::try_join!(
                    tokio::io::copy(&mut stdout, &mut stdout_buf),
                    tokio::io::copy(&mut stderr, &mut stderr_buf),
                    proc.wait(),
                )
            };
            match self.time_limit {
                Some(limit) => tokio::time::timeout(limit, work).await.ok(),
                None => Some(work.await),
            }
        };
        let execution_time = start_at.elapsed();

        match res {
            None => {
                proc.kill()
                    .await
                    .unwrap_or_else(|e| log::warn!("Failed to kill timed-out process: {:#}", e));
                Ok(RunOutcome {
                    execution_time,
                    output: None,
                })
            }
            Some(Err(e)) => Err(RunnerError::Capture(e)),
            Some(Ok((_, _, exit_status))) => Ok(RunOutcome {
                execution_time,
                output: Some(ExecutionOutcome {
                    status: exit_status.code(),
                    stdout: String::from_utf8_lossy(&stdout_buf).into_owned(),
                    stderr: String::from_utf8_lossy(&stderr_buf).into_owned(),
                }),
            }),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_and_exit_code_zero() {
        let r = ProcessRunner::new();
        let res = r.run("printf 'hello\\n'").await.unwrap();
        let output = res.output.unwrap();
        assert_eq!(output.status, Some(0));
        assert!(output.success());
        assert_eq!(output.stdout, "hello\n");
        assert_eq!(output.stderr, "");
    }

    #[tokio::test]
    async fn captures_stderr_separately() {
        let r = ProcessRunner::new();
        let res = r.run("printf 'out'; printf 'err' >&2").await.unwrap();
        let output = res.output.unwrap();
        assert_eq!(output.stdout, "out");
        assert_eq!(output.stderr, "err");
    }

    #[tokio::test]
    async fn reports_nonzero_exit_code_as_outcome_not_error() {
        let r = ProcessRunner::new();
        let res = r.run("printf 'partial'; exit 3").await.unwrap();
        let output = res.output.unwrap();
        assert_eq!(output.status, Some(3));
        assert!(!output.success());
        assert_eq!(output.stdout, "partial");
    }

    #[tokio::test]
    async fn kills_process_exceeding_time_limit() {
        let r = ProcessRunner::new().time_limit(Some(Duration::from_millis(100)));
        let res = r.run("sleep 5").await.unwrap();
        assert_eq!(res.output, None);
        assert!(res.execution_time >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn unspawnable_shell_is_a_runner_error() {
        let r = ProcessRunner::new().shell("/nonexistent/shell");
        let res = r.run("true").await;
        assert!(matches!(res, Err(RunnerError::Spawn { .. })));
    }
}
