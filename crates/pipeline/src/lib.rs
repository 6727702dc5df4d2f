//! Core domain for the DAG gate.
//!
//! This crate contains every domain concept, newtype identifier, policy rule
//! and error type used by the gate. Infrastructure crates implement the port
//! traits defined here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`TeamId`, `WorkflowName`, etc.) |
//! | [`types`] | Pull requests, changed files, process output, verdicts |
//! | [`errors`] | Fatal gate errors and transport errors |
//! | [`github`] | [`VersionControl`] port |
//! | [`process`] | [`CommandRunner`] port and [`CommandSpec`] |
//! | [`commands`] | Command lines for the scheduler and linters |
//! | [`policy`] | Fixed policy constants and output interpretation |
//! | [`source_checks`] | Schedule-interval and start-date checks |
//! | [`fakes`] | In-memory port implementations for tests |

pub mod commands;
pub mod errors;
pub mod fakes;
pub mod github;
pub mod identifiers;
pub mod policy;
pub mod process;
pub mod source_checks;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use commands::ToolCommands;
pub use errors::{GateError, GatewayError};
pub use github::VersionControl;
pub use identifiers::{
    CommitSha, GateRunId, PullRequestNumber, RepoPath, TaskName, TeamId, UserLogin, WorkflowName,
};
pub use policy::GatePolicy;
pub use process::{CommandRunner, CommandSpec};
pub use source_checks::IntervalCheck;
pub use types::{
    ChangedFile, CheckKind, CheckOutcome, FileStatus, GateOutcome, ProcessOutput,
    PullRequestRef, PullRequestState, ReferenceInstant, RunReport, ValidationResult, Verdict,
};
