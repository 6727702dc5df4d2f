//! Child-process port.
//!
//! Linters and the scheduler CLI are external collaborators; the pipeline
//! only builds a [`CommandSpec`] and consumes the resulting
//! [`ProcessOutput`]. The `runner` crate spawns real processes.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{GatewayError, ProcessOutput};

/// A fully resolved command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory; inherits the gate's own when `None`.
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
        }
    }

    pub fn in_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// The command as a single space-joined line, for logs and matching.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// Runs a command to completion and captures its streams.
///
/// A non-zero exit code is a normal [`ProcessOutput`]; only failures to start
/// or await the process are errors.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &CommandSpec) -> Result<ProcessOutput, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_joins_program_and_args() {
        let cmd = CommandSpec::new("pylint", ["-E", "PPADfoo.py"]).in_dir("/work");
        assert_eq!(cmd.command_line(), "pylint -E PPADfoo.py");
        assert_eq!(cmd.cwd, Some(PathBuf::from("/work")));
    }
}
