use std::time::Duration;

/// Exit status and fully-captured streams of one target-program run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// `None` when the process was terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionOutcome {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Raw result of a single ProcessRunner invocation, uninterpreted.
/// `output == None` means the time limit elapsed and the child was killed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub execution_time: Duration,
    pub output: Option<ExecutionOutcome>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum Verdict {
    #[strum(serialize = "PASS")]
    Pass,
    /// Normalized stdout differs from the normalized expected output.
    #[strum(serialize = "DIFF")]
    WrongOutput,
    /// The target exited non-zero; stdout is irrelevant.
    #[strum(serialize = "CRASH")]
    Crashed,
    #[strum(serialize = "TLE")]
    TimedOut,
    /// The run command itself could not be launched.
    #[strum(serialize = "ERR")]
    LaunchFailed,
    /// The challenge record had no `result` key.
    #[strum(serialize = "NORES")]
    NoExpected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    pub challenge_name: String,
    pub verdict: Verdict,
    pub diagnostic: String,
    pub normalized_actual: Option<String>,
    pub normalized_expected: Option<String>,
    pub checked_run: bool,
    pub execution_time: Duration,
    pub output: Option<ExecutionOutcome>,
}

impl TestResult {
    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Pass
    }

    /// The target never produced a comparable run (crash, timeout, launch failure).
    pub fn crashed(&self) -> bool {
        matches!(
            self.verdict,
            Verdict::Crashed | Verdict::TimedOut | Verdict::LaunchFailed
        )
    }
}

/// Ordered record of one session, built incrementally by the controller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Execution order == challenge-store document order.
    pub results: Vec<TestResult>,
    /// True when fail-fast stopped the run before the selection was exhausted.
    pub stopped_early: bool,
}

impl SessionSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, res: TestResult) {
        self.results.push(res);
    }

    pub fn num_passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    pub fn num_failed(&self) -> usize {
        self.results.len() - self.num_passed()
    }

    pub fn all_passed(&self) -> bool {
        self.num_failed() == 0
    }
}
