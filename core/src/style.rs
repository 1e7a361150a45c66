use std::{collections::HashMap, sync::Arc, time::Duration};

use colored::{Color, ColoredString, Colorize};
use crossterm::terminal;
use indicatif::ProgressBar;
use tokio::sync::Mutex;

use crate::testing::{SessionSummary, TestResult, Verdict};

#[macro_export]
macro_rules! print_success {
    ($fmt:literal, $($e:tt)*) => {
        use ::colored::Colorize as _;
        println!("{}", format!($fmt, $($e)*).green())
    }
}

pub fn is_truecolor_supported() -> bool {
    let Ok(v) = std::env::var("COLORTERM") else {
        return false
    };
    match v.as_str() {
        "truecolor" | "24bit" => true,
        _ => false,
    }
}

pub trait ColorTheme {
    fn color(&self) -> Color;
}

impl ColorTheme for Verdict {
    fn color(&self) -> Color {
        use Verdict::*;
        if !self::is_truecolor_supported() {
            return match self {
                Pass => Color::Green,
                WrongOutput | NoExpected => Color::Yellow,
                TimedOut => Color::Red,
                Crashed | LaunchFailed => Color::Magenta,
            };
        }

        match self {
            Pass => Color::TrueColor {
                r: 30,
                g: 180,
                b: 40,
            },
            WrongOutput | NoExpected => Color::TrueColor {
                r: 210,
                g: 138,
                b: 4,
            },
            TimedOut => Color::TrueColor {
                r: 220,
                g: 42,
                b: 42,
            },
            Crashed | LaunchFailed => Color::TrueColor {
                r: 171,
                g: 40,
                b: 200,
            },
        }
    }
}

pub fn verdict_icon(verdict: Verdict) -> ColoredString {
    let fg = if is_truecolor_supported() {
        Color::TrueColor {
            r: 255,
            g: 255,
            b: 255,
        }
    } else {
        Color::BrightBlack
    };
    format!(" {} ", verdict)
        .on_color(verdict.color())
        .bold()
        .color(fg)
}

/// Prints everything a user needs about one failed challenge: diagnostic,
/// expected output for reference, captured stdout/stderr.
pub fn print_test_result_detail(res: &TestResult) {
    let (cols, _) = terminal::size().unwrap_or((40, 40));

    const BOLD_LINE: &str = "━";
    const THIN_LINE: &str = "─";

    let bold_bar = BOLD_LINE.repeat(cols as usize).blue().bold();

    let title_color = Color::BrightYellow;
    println!(
        "\n{}: {} [{}ms]\n{}",
        res.challenge_name.color(title_color).bold(),
        self::verdict_icon(res.verdict),
        res.execution_time.as_millis(),
        bold_bar,
    );

    if !res.diagnostic.is_empty() {
        println!("{}", res.diagnostic);
    }

    fn print_sub_title(s: &str, cols: usize) {
        println!(
            "{}{}",
            s.cyan().bold(),
            THIN_LINE.repeat(cols.saturating_sub(s.len() + 1)).bright_black(),
        )
    }

    fn print_lines(lines: &[&str], entire_str: &str) {
        if lines.is_empty() {
            println!("{}", "<EMPTY>".magenta().dimmed());
            return;
        }
        for (i, line) in lines.iter().enumerate() {
            let trimmed = line.trim_end();
            print!("{}", trimmed);

            let num_trailling_whitespace = line.len() - trimmed.len();
            if num_trailling_whitespace > 0 {
                print!(
                    "{}{}",
                    " ".repeat(num_trailling_whitespace).on_red(),
                    "(Trailling whitespace)".bright_red().bold()
                );
            }

            let is_last_line = i + 1 == lines.len();
            if is_last_line && !entire_str.ends_with('\n') {
                print!("{}", " Missing new line ".on_yellow().black().bold());
            }

            println!();
        }
    }

    if let Some(expected) = &res.normalized_expected {
        print_sub_title("[expected]", cols as usize);
        let expected_lines: Vec<_> = expected.lines().collect();
        if expected.is_empty() {
            println!("{}", "<EMPTY>".magenta().dimmed());
        } else {
            for line in expected_lines {
                println!("{}", line);
            }
        }
    }

    if let Some(output) = &res.output {
        print_sub_title("[stdout]", cols as usize);
        let stdout_lines: Vec<_> = output.stdout.lines().collect();
        print_lines(&stdout_lines, &output.stdout);

        if !output.stderr.is_empty() {
            print_sub_title("[stderr]", cols as usize);
            print!("{}", output.stderr);
            if !output.stderr.ends_with('\n') {
                println!();
            }
        }
    }

    println!("{}", bold_bar);
}

/// Prints the final passed/failed counts. Returns true iff everything passed.
pub fn print_session_summary(summary: &SessionSummary) -> bool {
    let bar = "-".repeat(5);
    print!("{} ", bar);

    let results = &summary.results;
    let count: HashMap<Verdict, usize> = results.iter().fold(HashMap::new(), |mut count, r| {
        *count.entry(r.verdict).or_default() += 1;
        count
    });

    let num_total = results.len();
    let num_passed = *count.get(&Verdict::Pass).unwrap_or(&0);
    let num_failed = num_total - num_passed;

    if num_passed == num_total {
        let msg = format!("All {} challenges passed ✨", num_total);
        print!("{}", msg.green());
    } else {
        let summary_msg = if num_passed > 0 {
            format!("{}/{} challenges failed 💣", num_failed, num_total)
        } else {
            format!("All {} challenges failed 💀", num_total)
        };

        let detail_msg = count
            .iter()
            .filter(|(&verdict, _)| verdict != Verdict::Pass)
            .map(|(&verdict, &cnt)| {
                format!(
                    "{}{}{}",
                    self::verdict_icon(verdict),
                    "x".dimmed(),
                    cnt.to_string().bold().bright_white(),
                )
            })
            .collect::<Vec<String>>()
            .join(", ");

        print!("{} ({})", summary_msg.bright_red(), detail_msg);
    }

    if summary.stopped_early {
        print!(" {}", "[stopped early]".yellow());
    }

    println!(" {}", bar);
    num_failed == 0
}

pub trait SpinnerExt {
    fn with_ticking(self) -> Arc<Mutex<Self>>
    where
        Self: Sized;
}

impl SpinnerExt for ProgressBar {
    fn with_ticking(self) -> Arc<Mutex<Self>> {
        let mutex_spinner = Arc::new(Mutex::new(self));
        let spinner = mutex_spinner.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_millis(30)).await;
                let spinner = spinner.lock().await;
                if spinner.is_finished() {
                    break;
                }
                spinner.tick();
            }
        });
        mutex_spinner
    }
}
