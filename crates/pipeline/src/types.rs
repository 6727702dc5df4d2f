//! Shared value types for the DAG gate domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! state that the pipeline stages produce and consume: the resolved pull
//! request, the changed files of its head commit, captured process output and
//! the per-file validation records folded into the final verdict.

use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::{CommitSha, GateRunId, PullRequestNumber, RepoPath, UserLogin, WorkflowName};

// ---------------------------------------------------------------------------
// Pull requests
// ---------------------------------------------------------------------------

/// Lifecycle state of a pull request as reported by the version-control API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestState {
    Open,
    Closed,
    /// Any state string the gate does not recognise.
    Other(String),
}

impl PullRequestState {
    /// Maps the API's `state` field onto a [`PullRequestState`].
    pub fn from_api(state: &str) -> Self {
        match state {
            "open" => Self::Open,
            "closed" => Self::Closed,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

/// The pull request under validation.
///
/// Resolved once per run and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRef {
    pub number: PullRequestNumber,
    pub head_sha: CommitSha,
    pub author: UserLogin,
    pub state: PullRequestState,
}

// ---------------------------------------------------------------------------
// Changed files
// ---------------------------------------------------------------------------

/// Status of a file within a commit diff.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Added,
    Modified,
    Removed,
    Renamed,
    Copied,
    Changed,
    Unchanged,
    Other(String),
}

impl FileStatus {
    /// Maps the API's `files[].status` field onto a [`FileStatus`].
    pub fn from_api(status: &str) -> Self {
        match status {
            "added" => Self::Added,
            "modified" => Self::Modified,
            "removed" => Self::Removed,
            "renamed" => Self::Renamed,
            "copied" => Self::Copied,
            "changed" => Self::Changed,
            "unchanged" => Self::Unchanged,
            other => Self::Other(other.to_string()),
        }
    }
}

/// One entry of the head commit's file diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFile {
    pub path: RepoPath,
    pub status: FileStatus,
}

// ---------------------------------------------------------------------------
// Process output
// ---------------------------------------------------------------------------

/// Captured result of one child-process invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOutput {
    pub stderr: String,
    /// Standard output with surrounding whitespace trimmed.
    pub stdout: String,
    /// Exit code; `-1` when the process was terminated by a signal.
    pub exit_code: i32,
}

impl ProcessOutput {
    /// Returns `true` if the process exited with code 0.
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// The synthetic instant every schedule computation and dry-run is anchored to:
/// midnight at the start of the current day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReferenceInstant(NaiveDateTime);

impl ReferenceInstant {
    /// Midnight at the start of `date`.
    pub fn start_of(date: NaiveDate) -> Self {
        Self(date.and_time(chrono::NaiveTime::MIN))
    }

    /// Midnight at the start of today, in local time.
    pub fn start_of_today() -> Self {
        Self::start_of(Local::now().date_naive())
    }

    pub fn as_naive(self) -> NaiveDateTime {
        self.0
    }
}

impl std::fmt::Display for ReferenceInstant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S"))
    }
}

// ---------------------------------------------------------------------------
// Verdicts
// ---------------------------------------------------------------------------

/// Pass/fail outcome of a single recorded check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Passed,
    Failed,
}

impl Verdict {
    /// [`Verdict::Failed`] if `failed`, otherwise [`Verdict::Passed`].
    pub fn from_failure(failed: bool) -> Self {
        if failed {
            Self::Failed
        } else {
            Self::Passed
        }
    }

    pub fn is_failed(self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Passed => f.write_str("PASSED"),
            Self::Failed => f.write_str("FAILED"),
        }
    }
}

/// The kind of check a [`CheckOutcome`] was recorded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Flake8,
    PyLint,
    /// Test and render dry-runs of every task of one workflow.
    DagTest,
}

impl CheckKind {
    /// Label used in the transcript and the final report.
    pub fn label(self) -> &'static str {
        match self {
            Self::Flake8 => "Flake8 Syntax TEST",
            Self::PyLint => "PyLint Syntax TEST",
            Self::DagTest => "AirFlow DAG Test",
        }
    }
}

/// One verdict label appended to a file's [`ValidationResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub kind: CheckKind,
    /// Workflow the check ran against; `None` for file-level checks.
    pub workflow: Option<WorkflowName>,
    pub verdict: Verdict,
}

impl std::fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.kind.label(), self.verdict)
    }
}

/// Append-only record of everything the pipeline established about one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub file: RepoPath,
    pub workflows: Vec<WorkflowName>,
    pub outcomes: Vec<CheckOutcome>,
}

impl ValidationResult {
    pub fn new(file: RepoPath) -> Self {
        Self {
            file,
            workflows: Vec::new(),
            outcomes: Vec::new(),
        }
    }

    /// Appends a file-level syntax verdict.
    pub fn record_syntax(&mut self, kind: CheckKind, verdict: Verdict) {
        self.outcomes.push(CheckOutcome {
            kind,
            workflow: None,
            verdict,
        });
    }

    /// Appends the dry-run verdict of one workflow.
    pub fn record_workflow(&mut self, workflow: WorkflowName, verdict: Verdict) {
        self.workflows.push(workflow.clone());
        self.outcomes.push(CheckOutcome {
            kind: CheckKind::DagTest,
            workflow: Some(workflow),
            verdict,
        });
    }

    /// Returns `true` if any recorded outcome failed.
    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(|o| o.verdict.is_failed())
    }

    /// Flattened view: file path, workflow names, then every verdict label.
    pub fn labels(&self) -> Vec<String> {
        std::iter::once(self.file.to_string())
            .chain(self.workflows.iter().map(ToString::to_string))
            .chain(self.outcomes.iter().map(ToString::to_string))
            .collect()
    }
}

impl std::fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.labels().join(", "))
    }
}

// ---------------------------------------------------------------------------
// Run outcome
// ---------------------------------------------------------------------------

/// Everything a completed run recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: GateRunId,
    pub pull_request: PullRequestRef,
    pub files: Vec<ValidationResult>,
    /// Files skipped because they were missing from the checkout of an
    /// allow-listed team.
    pub skipped: Vec<RepoPath>,
}

impl RunReport {
    /// OR-reduction of every recorded failure.
    pub fn verdict(&self) -> Verdict {
        Verdict::from_failure(self.files.iter().any(ValidationResult::has_failures))
    }
}

/// Non-fatal result of a gate run. Fatal conditions are returned as
/// [`crate::GateError`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateOutcome {
    /// The pull request touched no workflow files.
    NothingToValidate { pull_request: PullRequestRef },
    /// Every changed workflow file went through the pipeline.
    Completed(RunReport),
}

impl GateOutcome {
    pub fn verdict(&self) -> Verdict {
        match self {
            Self::NothingToValidate { .. } => Verdict::Passed,
            Self::Completed(report) => report.verdict(),
        }
    }
}
