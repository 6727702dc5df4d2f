//! DAG gate pipeline stages and the executor that drives them.
//!
//! This crate provides one module per stage (pull-request resolution, policy
//! filter, workflow/task enumeration, syntax verification, dry-run
//! verification) and the [`GateExecutor`] that sequences them across every
//! changed file.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** Stages sequence calls between business logic in the
//! [`pipeline`] crate and the port traits ([`pipeline::VersionControl`],
//! [`pipeline::CommandRunner`]). They contain no policy rules of their own.
//!
//! Every stage receives its ports by reference and returns its results as
//! values; fatal conditions travel up as [`pipeline::GateError`] to the
//! executor, which alone decides the outcome of the run.

pub mod dry_run;
pub mod enumerator;
pub mod executor;
pub mod policy_filter;
pub mod resolver;
pub mod syntax;

pub use dry_run::{DryRunState, DryRunVerifier, TaskEvaluation, WorkflowDryRun};
pub use executor::GateExecutor;
pub use policy_filter::PolicyReport;
pub use syntax::LintResult;

use pipeline::{CommandRunner, CommandSpec, ProcessOutput};
use tracing::{debug, warn};

/// Runs a command whose failure is recorded rather than fatal.
///
/// A command that cannot be started yields exit code `-1` with the transport
/// error as its stderr, so it counts as a failure in every evaluation.
pub(crate) async fn run_recorded(
    runner: &dyn CommandRunner,
    command: &CommandSpec,
) -> ProcessOutput {
    debug!(command = %command, "running");
    match runner.run(command).await {
        Ok(output) => output,
        Err(error) => {
            warn!(command = %command, %error, "command could not be run");
            ProcessOutput {
                stderr: error.to_string(),
                stdout: String::new(),
                exit_code: -1,
            }
        }
    }
}
