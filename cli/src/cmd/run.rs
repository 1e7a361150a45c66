use chal_core::action::{self, Selection, SessionOptions};
use chal_core::challenge::ChallengeStore;
use chal_core::style;
use chal_core::testing::{RunMode, ShellTool};
use chal_core::Config;

use crate::util;

use super::{GlobalArgs, SubcmdResult};

#[derive(Debug, clap::Args)]
pub struct Args {
    /// Run only this challenge (default: all, in file order)
    #[arg()] // positional argument
    pub challenge_name: Option<String>,

    /// Run the target under the memory/behavior checker
    #[arg(short = 'c', long)]
    pub checked: bool,

    /// Stop at the first failing challenge
    #[arg(long)]
    pub fail_fast: bool,

    /// Do not hand off to the debugger on failure
    #[arg(long)]
    pub no_debugger: bool,

    /// Leave the input slot and captured-output files on disk
    #[arg(long)]
    pub keep_scratch: bool,
}

pub async fn exec(args: &Args, _global_args: &GlobalArgs) -> SubcmdResult {
    let cfg = Config::from_file_finding_in_ancestors(util::current_dir())?;
    let store = ChallengeStore::load(cfg.challenges_file_path())?;

    let opt = SessionOptions {
        selection: match &args.challenge_name {
            Some(name) => Selection::Single(name.clone()),
            None => Selection::All,
        },
        mode: if args.checked {
            RunMode::Checked
        } else {
            RunMode::Direct
        },
        fail_fast: args.fail_fast,
        skip_debugger: args.no_debugger,
        keep_scratch: args.keep_scratch,
    };
    let tools = ShellTool::new(&cfg.run.shell);

    let summary = action::run_session(&cfg, &store, &opt, &tools).await?;

    if !style::print_session_summary(&summary) {
        std::process::exit(1);
    }
    Ok(())
}
