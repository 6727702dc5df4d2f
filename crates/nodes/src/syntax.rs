//! Syntax verification with the two linters.
//!
//! Both linters always run and only their exit codes decide the verdicts.
//! This stage never fails the run; it only produces verdicts.

use pipeline::{CheckKind, CommandRunner, ProcessOutput, RepoPath, ToolCommands, Verdict};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::run_recorded;

/// Verdict of one linter run, with its captured output for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LintResult {
    pub kind: CheckKind,
    pub verdict: Verdict,
    pub output: ProcessOutput,
}

/// Runs flake8 then pylint against `file`.
#[instrument(skip_all, fields(file = %file))]
pub async fn verify_syntax(
    runner: &dyn CommandRunner,
    commands: &ToolCommands,
    file: &RepoPath,
) -> Vec<LintResult> {
    let mut results = Vec::with_capacity(2);
    for (kind, command) in [
        (CheckKind::Flake8, commands.flake8(file)),
        (CheckKind::PyLint, commands.pylint(file)),
    ] {
        let output = run_recorded(runner, &command).await;
        let verdict = Verdict::from_failure(!output.succeeded());
        if verdict.is_failed() {
            warn!(
                check = kind.label(),
                exit_code = output.exit_code,
                stdout = %output.stdout,
                stderr = %output.stderr,
                "there are errors in your syntax"
            );
        } else {
            info!(check = kind.label(), "there are no syntax errors");
        }
        results.push(LintResult {
            kind,
            verdict,
            output,
        });
    }
    results
}
