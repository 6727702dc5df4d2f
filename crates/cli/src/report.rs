//! The human-readable report printed at the end of a run, and the exit
//! status derived from it.

use std::fmt::Write as _;

use pipeline::{GateError, GateOutcome, RunReport, Verdict};

const WIDTH: usize = 120;

const NOTHING_TO_VALIDATE: &str = "No DAG files have been found in your Pull Request. If you updated files that are not\n\
     DAGS, please contact Admin team in order to review your Pull request manually.";

const PASSED: &str = "Your Pull Request PASSED. The pull request has been automatically merged.";

const FAILED: &str = "Your Pull Request has FAILED. Please review the log file and correct the errors\n\
     and resubmit your Pull request by typing 'please rebuild' in Conversation under\n\
     GitHub Pull Request tab.";

fn rule() -> String {
    "=".repeat(WIDTH)
}

/// Renders the final report of a run.
pub fn render(result: &Result<GateOutcome, GateError>) -> String {
    match result {
        Ok(GateOutcome::NothingToValidate { .. }) => format!("{NOTHING_TO_VALIDATE}\n"),
        Ok(GateOutcome::Completed(report)) => render_report(report),
        Err(error) => format!("{error}\n{}\n", rule()),
    }
}

fn render_report(report: &RunReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n\n{:=^WIDTH$}\n", "TEST RESULTS");
    for file in &report.files {
        let _ = writeln!(out, "{file}");
    }
    for path in &report.skipped {
        let _ = writeln!(out, "[{path}, skipped: not found in checkout]");
    }
    let message = match report.verdict() {
        Verdict::Passed => PASSED,
        Verdict::Failed => FAILED,
    };
    let _ = writeln!(out, "\n{message}");
    let _ = writeln!(out, "{}\n", rule());
    out
}

/// `0` when every check passed or there was nothing to check, `1` otherwise.
pub fn exit_code(result: &Result<GateOutcome, GateError>) -> u8 {
    match result {
        Ok(outcome) if !outcome.verdict().is_failed() => 0,
        _ => 1,
    }
}
