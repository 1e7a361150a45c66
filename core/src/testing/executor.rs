use std::time::Duration;

use fsutil::ScratchFile;

use super::result::{ExecutionOutcome, TestResult, Verdict};
use super::runner::ProcessRunner;
use crate::challenge::Challenge;
use crate::normalize::normalize;

/// How the target program is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// The plain run command.
    Direct,
    /// The memory/behavior-checker wrapper command.
    Checked,
}

#[derive(Debug, Clone)]
pub struct RunCommands {
    pub direct: String,
    pub checked: String,
}

impl RunCommands {
    pub fn select(&self, mode: RunMode) -> &str {
        match mode {
            RunMode::Direct => &self.direct,
            RunMode::Checked => &self.checked,
        }
    }
}

/// Runs one challenge at a time against the target program.
///
/// The input slot and the capture file are owned by `execute` for the whole
/// call: the slot is fully written before the run starts, the capture file is
/// fully written before the call returns. Execution is strictly sequential;
/// running two challenges concurrently would corrupt both files.
#[derive(Debug)]
pub struct Executor {
    runner: ProcessRunner,
    commands: RunCommands,
    mode: RunMode,
    input_slot: ScratchFile,
    capture_file: ScratchFile,
}

impl Executor {
    pub fn new(
        runner: ProcessRunner,
        commands: RunCommands,
        mode: RunMode,
        input_slot: ScratchFile,
        capture_file: ScratchFile,
    ) -> Self {
        Self {
            runner,
            commands,
            mode,
            input_slot,
            capture_file,
        }
    }

    pub async fn execute(&self, challenge: &Challenge) -> TestResult {
        if let Err(e) = self.input_slot.write(&challenge.source) {
            return self.result(
                challenge,
                Verdict::LaunchFailed,
                format!("Cannot write challenge source: {}", e),
                Duration::ZERO,
                None,
            );
        }

        let command = self.commands.select(self.mode);
        let run = match self.runner.run(command).await {
            Ok(run) => run,
            Err(e) => {
                return self.result(
                    challenge,
                    Verdict::LaunchFailed,
                    format!("{:#}", anyhow::Error::new(e)),
                    Duration::ZERO,
                    None,
                )
            }
        };

        let Some(output) = run.output else {
            let limit = self.runner.get_time_limit().unwrap_or_default();
            return self.result(
                challenge,
                Verdict::TimedOut,
                format!(
                    "Execution did not finish within {}ms; process killed",
                    limit.as_millis()
                ),
                run.execution_time,
                None,
            );
        };

        // Persisted for post-hoc inspection; written in full before returning.
        self.capture_file
            .write(&output.stdout)
            .unwrap_or_else(|e| log::warn!("Cannot persist captured output: {}", e));

        if !output.success() {
            let code = output
                .status
                .map_or("none (terminated by signal)".to_owned(), |c| c.to_string());
            let diagnostic = format!(
                "Execution returned error code {}\n{}",
                code,
                output.stderr.trim_end()
            );
            return self.result(
                challenge,
                Verdict::Crashed,
                diagnostic,
                run.execution_time,
                Some(output),
            );
        }

        let Some(expected) = &challenge.expected else {
            return self.result(
                challenge,
                Verdict::NoExpected,
                "No expected result configured".to_owned(),
                run.execution_time,
                Some(output),
            );
        };

        let normalized_actual = normalize(&output.stdout);
        let normalized_expected = normalize(expected);
        let (verdict, diagnostic) = if normalized_actual == normalized_expected {
            (Verdict::Pass, String::new())
        } else {
            (Verdict::WrongOutput, "Output mismatch".to_owned())
        };

        TestResult {
            challenge_name: challenge.name.clone(),
            verdict,
            diagnostic,
            normalized_actual: Some(normalized_actual),
            normalized_expected: Some(normalized_expected),
            checked_run: self.mode == RunMode::Checked,
            execution_time: run.execution_time,
            output: Some(output),
        }
    }

    fn result(
        &self,
        challenge: &Challenge,
        verdict: Verdict,
        diagnostic: String,
        execution_time: Duration,
        output: Option<ExecutionOutcome>,
    ) -> TestResult {
        TestResult {
            challenge_name: challenge.name.clone(),
            verdict,
            diagnostic,
            normalized_actual: None,
            normalized_expected: challenge.expected.as_deref().map(normalize),
            checked_run: self.mode == RunMode::Checked,
            execution_time,
            output,
        }
    }
}
