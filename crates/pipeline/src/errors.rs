//! Top-level error types for the DAG gate domain.
//!
//! [`GateError`] covers every fatal precondition: conditions that halt the run
//! immediately and are never retried. Recorded failures (linter findings,
//! failing dry-runs) are not errors; they are accumulated in
//! [`crate::ValidationResult`] and only influence the final verdict.
//!
//! [`GatewayError`] describes transport failures of the external collaborators
//! (the version-control API and child processes).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CommitSha, RepoPath, TeamId, UserLogin, WorkflowName};

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// Failure talking to an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GatewayError {
    /// The API answered with a non-success status code.
    #[error("HTTP error {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    /// The API could not be reached.
    #[error("error connecting to {url}: {message}")]
    Connect { url: String, message: String },

    /// The API did not answer within the fixed request ceiling.
    #[error("timeout waiting for {url}")]
    Timeout { url: String },

    /// The API answered but the body was not the expected JSON shape.
    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },

    /// Any other request failure.
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    /// A child process could not be started or awaited.
    #[error("failed to run '{program}': {message}")]
    Spawn { program: String, message: String },
}

// ---------------------------------------------------------------------------
// Fatal gate errors
// ---------------------------------------------------------------------------

/// Conditions that terminate the run with a non-zero status.
///
/// Every variant's message is written for the pull-request author; the CLI
/// prints it verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GateError {
    /// No open pull request is authored by the submitting user.
    #[error(
        "did not find any open pull request from '{user}' in '{team}' \
         (open pull requests are from: {open_authors:?}); please resubmit your pull request"
    )]
    PullRequestNotFound {
        team: TeamId,
        user: UserLogin,
        open_authors: Vec<String>,
    },

    /// The pull request carries more than one commit.
    #[error(
        "found {count} commits in pull request {head_sha}; \
         please squash your commits and resubmit your pull request"
    )]
    UnsquashedCommits { count: usize, head_sha: CommitSha },

    /// A workflow file that is not a Python source.
    #[error("'{path}' is not a python script or does not end with .py; please upload only .py DAG files")]
    InvalidFileExtension { path: RepoPath },

    /// `@once` and `@yearly` are rejected outright.
    #[error("schedule_interval '{interval}' is not allowed; please update your DAG to run at batch intervals")]
    DisallowedInterval { interval: String },

    /// The cron expression fires too soon after the reference instant.
    #[error(
        "schedule_interval '{interval}' fires every {gap_minutes} minutes; \
         DAGs must run at intervals of {minimum_minutes} minutes or more"
    )]
    CadenceTooShort {
        interval: String,
        gap_minutes: i64,
        minimum_minutes: i64,
    },

    /// The interval literal is not a macro and not a valid cron expression.
    #[error("schedule_interval '{interval}' could not be parsed: {reason}")]
    UnparseableInterval { interval: String, reason: String },

    /// A `schedule_interval` assignment without a string literal.
    #[error("schedule_interval must be assigned a string literal, found: {line}")]
    IntervalNotLiteral { line: String },

    /// `start_date` derived from the time the file is evaluated.
    #[error(
        "start_date is derived from the current time ({lines:?}); \
         please hardcode start_date to the date your DAG was first deployed"
    )]
    DynamicStartDate { lines: Vec<String> },

    /// A changed workflow file does not exist in the checkout.
    #[error("workflow file '{path}' was not found")]
    SourceMissing { path: RepoPath },

    /// A changed workflow file exists but could not be read.
    #[error("workflow file '{path}' could not be read: {message}")]
    SourceUnreadable { path: RepoPath, message: String },

    /// The scheduler reported an error while loading the file.
    #[error("your DAG file '{file}' has errors; please correct them and resubmit:\n{output}")]
    WorkflowLoadFailed { file: RepoPath, output: String },

    /// No workflow identifiers were found in the file.
    #[error("no DAGs were detected in '{file}'; please review your DAG")]
    NoWorkflowsDetected { file: RepoPath },

    /// A workflow identifier containing whitespace.
    #[error("there is whitespace in DAG name '{name}'; please resolve it")]
    MalformedWorkflowName { name: String },

    /// A workflow identifier carrying the source-file extension.
    #[error("DAG name '{name}' contains .py; please remove the extension and resubmit")]
    WorkflowNameHasExtension { name: String },

    /// A workflow that lists no tasks.
    #[error("no tasks were detected for DAG '{workflow}' in '{file}'")]
    NoTasksDetected { file: RepoPath, workflow: WorkflowName },

    /// A transport failure that prevents the run from continuing.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl GateError {
    /// Returns `true` for the missing-file condition that the allow-listed
    /// teams may skip.
    pub fn is_source_missing(&self) -> bool {
        matches!(self, Self::SourceMissing { .. })
    }
}
