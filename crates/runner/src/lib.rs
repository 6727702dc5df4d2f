//! Child-process infrastructure adapter.
//!
//! Implements [`pipeline::CommandRunner`] by spawning the program with
//! [`tokio::process::Command`] and waiting for it to exit.
//!
//! ## Architectural Layer
//!
//! **Infrastructure adapter.** Contains no business logic. Exit codes are
//! reported as-is; deciding whether an output means failure is the
//! pipeline's job.

use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use pipeline::{CommandRunner, CommandSpec, GatewayError, ProcessOutput};
use tokio::process::Command;
use tracing::debug;

/// Runs commands as real child processes.
///
/// Standard input is closed; both output streams are captured in full.
#[derive(Debug, Clone, Default)]
pub struct TokioCommandRunner;

impl TokioCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, command: &CommandSpec) -> Result<ProcessOutput, GatewayError> {
        let start = Instant::now();
        let mut process = Command::new(&command.program);
        process
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &command.cwd {
            process.current_dir(cwd);
        }

        let spawn_error = |e: std::io::Error| GatewayError::Spawn {
            program: command.program.clone(),
            message: e.to_string(),
        };
        let output = process
            .spawn()
            .map_err(spawn_error)?
            .wait_with_output()
            .await
            .map_err(spawn_error)?;

        let result = ProcessOutput {
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        };
        debug!(
            command = %command,
            exit_code = result.exit_code,
            duration_ms = start.elapsed().as_millis() as u64,
            "command finished"
        );
        Ok(result)
    }
}
