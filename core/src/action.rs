pub mod error {
    #[allow(unused_imports)]
    pub(crate) use anyhow::{anyhow, bail, ensure, Context as _};
    pub use anyhow::{Error, Result};
}
use std::path::Path;

use colored::Colorize;
use error::*;
use fsutil::ScratchFile;
use indicatif::{ProgressBar, ProgressStyle};

use crate::challenge::{Challenge, ChallengeStore};
use crate::config::Config;
use crate::style::{self, SpinnerExt};
use crate::testing::{
    Executor, ExternalTool, ProcessRunner, RunCommands, RunMode, SessionSummary,
};

/// Which challenges a session runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every challenge, in document order.
    All,
    Single(String),
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub selection: Selection,
    pub mode: RunMode,
    /// Stop at the first failing challenge.
    pub fail_fast: bool,
    /// Suppress the debugger hand-off even when something failed.
    pub skip_debugger: bool,
    /// Leave the input slot and capture file on disk after the run.
    pub keep_scratch: bool,
}

/// Errors that abort the whole session. Per-challenge failures are never one
/// of these; they are recorded as failing TestResults instead.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("No such challenge: '{0}'")]
    ChallengeNotFound(String),

    #[error("Build failed: {detail}")]
    Build { detail: String },

    #[error(transparent)]
    Tool(#[from] anyhow::Error),
}

/// Builds the target, runs the selected challenges sequentially, hands off to
/// the debugger when something failed, and cleans up the scratch files.
///
/// Failure details are printed as they happen; the caller prints the summary
/// via [`style::print_session_summary`].
pub async fn run_session<T: ExternalTool>(
    cfg: &Config,
    store: &ChallengeStore,
    opt: &SessionOptions,
    tools: &T,
) -> std::result::Result<SessionSummary, SessionError> {
    // Selection resolves before anything external runs, so an unknown name
    // never triggers a build.
    let selected: Vec<&Challenge> = match &opt.selection {
        Selection::All => store.iter().collect(),
        Selection::Single(name) => {
            let challenge = store
                .get(name)
                .ok_or_else(|| SessionError::ChallengeNotFound(name.clone()))?;
            vec![challenge]
        }
    };
    if selected.is_empty() {
        log::warn!("No challenges to run");
    }

    log::info!("Building target: {}", cfg.build.command);
    let build = tools.run_captured(&cfg.build.command).await?;
    if !build.success() {
        let code = build
            .status
            .map_or("none (terminated by signal)".to_owned(), |c| c.to_string());
        return Err(SessionError::Build {
            detail: format!("exit code {}\n{}", code, build.stderr.trim_end()),
        });
    }

    let executor = Executor::new(
        ProcessRunner::new()
            .shell(&cfg.run.shell)
            .time_limit(cfg.time_limit()),
        RunCommands {
            direct: cfg.run.direct.clone(),
            checked: cfg.run.checked.clone(),
        },
        opt.mode,
        ScratchFile::new(cfg.input_slot_path()),
        ScratchFile::new(cfg.capture_file_path()),
    );

    let run_cmd = match opt.mode {
        RunMode::Direct => &cfg.run.direct,
        RunMode::Checked => &cfg.run.checked,
    };
    log::info!("Running: {}", run_cmd);

    let spinner_style = ProgressStyle::default_bar()
        .template("{spinner} {msg}")
        .unwrap();

    let mut summary = SessionSummary::new();
    for challenge in selected {
        let spinner = ProgressBar::new(100)
            .with_style(spinner_style.clone())
            .with_message(format!("Challenge {} ...", challenge.name))
            .with_ticking();

        let res = executor.execute(challenge).await;

        spinner.lock().await.finish_with_message(
            format!(
                "Challenge {} ... {} [{}ms]",
                challenge.name,
                style::verdict_icon(res.verdict),
                res.execution_time.as_millis(),
            )
            .cyan()
            .to_string(),
        );

        let failed = !res.passed();
        if failed {
            style::print_test_result_detail(&res);
        }
        summary.push(res);

        if failed && opt.fail_fast {
            summary.stopped_early = true;
            log::info!("Fail-fast: remaining challenges skipped");
            break;
        }
    }

    if !summary.all_passed() && !opt.skip_debugger {
        if let Some(debugger) = &cfg.debugger {
            log::info!("Handing off to debugger: {}", debugger.command);
            tools.run_interactive(&debugger.command).await?;
        }
    }

    if !opt.keep_scratch {
        for path in [cfg.input_slot_path(), cfg.capture_file_path()] {
            fsutil::remove_file_if_exists(&path).unwrap_or_else(|e| log::warn!("{}", e));
        }
    }

    Ok(summary)
}

/// Materializes the example config and challenge file, skipping existing ones.
pub fn init_harness(dir: impl AsRef<Path>) -> Result<()> {
    let dir = dir.as_ref();
    fsutil::mkdir_all(dir)?;

    for (filename, contents) in [
        (Config::FILENAME, Config::example_toml()),
        (
            Config::EXAMPLE_CHALLENGES_FILENAME,
            Config::example_challenges_toml(),
        ),
    ] {
        let path = dir.join(filename);
        if path.exists() {
            log::warn!("Skip existing file: {}", path.to_string_lossy());
            continue;
        }
        fsutil::write(&path, contents)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::config::{BuildConfig, ChallengeFileConfig, DebuggerConfig, RunConfig};
    use crate::testing::ToolOutcome;

    /// Canned build/debugger collaborators that record their invocations.
    struct FakeTool {
        build_status: i32,
        invocations: Mutex<Vec<String>>,
    }

    impl FakeTool {
        fn new(build_status: i32) -> Self {
            Self {
                build_status,
                invocations: Mutex::new(Vec::new()),
            }
        }

        fn invocations(&self) -> Vec<String> {
            self.invocations.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ExternalTool for FakeTool {
        async fn run_captured(&self, command: &str) -> Result<ToolOutcome> {
            self.invocations
                .lock()
                .unwrap()
                .push(format!("captured: {}", command));
            Ok(ToolOutcome {
                status: Some(self.build_status),
                stdout: String::new(),
                stderr: "build diagnostics".to_owned(),
            })
        }

        async fn run_interactive(&self, command: &str) -> Result<Option<i32>> {
            self.invocations
                .lock()
                .unwrap()
                .push(format!("interactive: {}", command));
            Ok(Some(0))
        }
    }

    fn test_config(tag: &str) -> Config {
        let dir = std::env::temp_dir().join(format!("chal-session-{}-{}", std::process::id(), tag));
        std::fs::create_dir_all(&dir).unwrap();
        let slot = dir.join("challenge");
        Config {
            source_config_file: Some(dir.join(Config::FILENAME)),
            build: BuildConfig {
                command: "build-target".to_owned(),
            },
            run: RunConfig {
                // The fake target program: prints the slot content, failing
                // loudly when the source contains the word "boom".
                direct: format!(
                    "grep -q boom {slot} && exit 1; cat {slot}",
                    slot = slot.display()
                ),
                checked: format!("cat {}", slot.display()),
                shell: PathBuf::from("/bin/sh"),
                time_limit_ms: None,
            },
            challenges: ChallengeFileConfig::default(),
            debugger: Some(DebuggerConfig {
                command: "debug-target".to_owned(),
            }),
        }
    }

    fn store_pass_fail_pass() -> ChallengeStore {
        ChallengeStore::from_toml(
            r#"
[a]
challenge = "ok a"
result = "ok a"

[b]
challenge = "boom"
result = "anything"

[c]
challenge = "ok c"
result = "ok c"
"#,
        )
        .unwrap()
    }

    fn options(selection: Selection) -> SessionOptions {
        SessionOptions {
            selection,
            mode: RunMode::Direct,
            fail_fast: false,
            skip_debugger: true,
            keep_scratch: false,
        }
    }

    #[tokio::test]
    async fn unknown_challenge_fails_before_any_tool_runs() {
        let cfg = test_config("notfound");
        let tools = FakeTool::new(0);
        let res = run_session(
            &cfg,
            &store_pass_fail_pass(),
            &options(Selection::Single("missing".to_owned())),
            &tools,
        )
        .await;

        assert!(matches!(res, Err(SessionError::ChallengeNotFound(name)) if name == "missing"));
        assert!(tools.invocations().is_empty());
    }

    #[tokio::test]
    async fn build_failure_is_fatal_and_runs_nothing() {
        let cfg = test_config("buildfail");
        let tools = FakeTool::new(2);
        let res = run_session(
            &cfg,
            &store_pass_fail_pass(),
            &options(Selection::All),
            &tools,
        )
        .await;

        let err = res.unwrap_err();
        assert!(matches!(&err, SessionError::Build { detail } if detail.contains("exit code 2")));
        assert_eq!(tools.invocations().len(), 1);
    }

    #[tokio::test]
    async fn full_run_collects_all_results_in_order() {
        let cfg = test_config("full");
        let tools = FakeTool::new(0);
        let summary = run_session(
            &cfg,
            &store_pass_fail_pass(),
            &options(Selection::All),
            &tools,
        )
        .await
        .unwrap();

        let names: Vec<_> = summary
            .results
            .iter()
            .map(|r| r.challenge_name.as_str())
            .collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert!(!summary.stopped_early);
        assert_eq!(summary.num_passed(), 2);
        assert_eq!(summary.num_failed(), 1);
        assert!(summary.results[2].passed());
    }

    #[tokio::test]
    async fn fail_fast_stops_after_first_failure() {
        let cfg = test_config("failfast");
        let tools = FakeTool::new(0);
        let mut opt = options(Selection::All);
        opt.fail_fast = true;

        let summary = run_session(&cfg, &store_pass_fail_pass(), &opt, &tools)
            .await
            .unwrap();

        let names: Vec<_> = summary
            .results
            .iter()
            .map(|r| r.challenge_name.as_str())
            .collect();
        assert_eq!(names, ["a", "b"]);
        assert!(summary.stopped_early);
    }

    #[tokio::test]
    async fn single_challenge_mode_runs_only_that_challenge() {
        let cfg = test_config("single");
        let tools = FakeTool::new(0);
        let summary = run_session(
            &cfg,
            &store_pass_fail_pass(),
            &options(Selection::Single("c".to_owned())),
            &tools,
        )
        .await
        .unwrap();

        assert_eq!(summary.results.len(), 1);
        assert_eq!(summary.results[0].challenge_name, "c");
        assert!(summary.all_passed());
    }

    #[tokio::test]
    async fn debugger_runs_on_failure_unless_suppressed() {
        let cfg = test_config("debugger");

        let tools = FakeTool::new(0);
        let mut opt = options(Selection::All);
        opt.skip_debugger = false;
        run_session(&cfg, &store_pass_fail_pass(), &opt, &tools)
            .await
            .unwrap();
        assert!(tools
            .invocations()
            .contains(&"interactive: debug-target".to_owned()));

        let tools = FakeTool::new(0);
        run_session(
            &cfg,
            &store_pass_fail_pass(),
            &options(Selection::All),
            &tools,
        )
        .await
        .unwrap();
        assert!(!tools.invocations().iter().any(|s| s.starts_with("interactive")));
    }

    #[tokio::test]
    async fn debugger_does_not_run_when_everything_passes() {
        let cfg = test_config("allpass");
        let tools = FakeTool::new(0);
        let mut opt = options(Selection::Single("a".to_owned()));
        opt.skip_debugger = false;

        let summary = run_session(&cfg, &store_pass_fail_pass(), &opt, &tools)
            .await
            .unwrap();
        assert!(summary.all_passed());
        assert!(!tools.invocations().iter().any(|s| s.starts_with("interactive")));
    }

    #[tokio::test]
    async fn scratch_files_are_cleaned_up_unless_suppressed() {
        let cfg = test_config("cleanup");
        let tools = FakeTool::new(0);

        run_session(
            &cfg,
            &store_pass_fail_pass(),
            &options(Selection::Single("a".to_owned())),
            &tools,
        )
        .await
        .unwrap();
        assert!(!cfg.input_slot_path().exists());
        assert!(!cfg.capture_file_path().exists());

        let mut opt = options(Selection::Single("a".to_owned()));
        opt.keep_scratch = true;
        run_session(&cfg, &store_pass_fail_pass(), &opt, &tools)
            .await
            .unwrap();
        assert!(cfg.input_slot_path().exists());
        assert_eq!(
            std::fs::read_to_string(cfg.capture_file_path()).unwrap(),
            "ok a"
        );
    }

    #[test]
    fn init_harness_writes_example_files() {
        let dir = std::env::temp_dir().join(format!("chal-init-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);

        init_harness(&dir).unwrap();
        assert!(dir.join(Config::FILENAME).is_file());
        assert!(dir.join(Config::EXAMPLE_CHALLENGES_FILENAME).is_file());

        // Existing files stay untouched.
        std::fs::write(dir.join(Config::FILENAME), "custom").unwrap();
        init_harness(&dir).unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.join(Config::FILENAME)).unwrap(),
            "custom"
        );

        let _ = std::fs::remove_dir_all(&dir);
    }
}
