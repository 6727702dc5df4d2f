//! Command lines for the external tools the gate drives.
//!
//! The argument vectors are built directly, so no shell quoting is involved;
//! the reference instant travels as a single argument.

use std::path::{Path, PathBuf};

use crate::{CommandSpec, ReferenceInstant, RepoPath, TaskName, WorkflowName};

const SCHEDULER: &str = "airflow";
const FLAKE8: &str = "flake8";
const PYLINT: &str = "pylint";
const MAX_LINE_LENGTH: &str = "--max-line-length=160";

/// Builds command lines relative to the checkout the gate runs in.
#[derive(Debug, Clone)]
pub struct ToolCommands {
    workdir: PathBuf,
}

impl ToolCommands {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Absolute location of a workflow file in the checkout.
    pub fn source_path(&self, file: &RepoPath) -> PathBuf {
        self.workdir.join(file.as_str())
    }

    fn spec<I, S>(&self, program: &str, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec::new(program, args).in_dir(self.workdir.clone())
    }

    /// `airflow dags list -o json -S ./<file>`
    pub fn list_workflows(&self, file: &RepoPath) -> CommandSpec {
        self.spec(
            SCHEDULER,
            [
                "dags".to_string(),
                "list".to_string(),
                "-o".to_string(),
                "json".to_string(),
                "-S".to_string(),
                format!("./{file}"),
            ],
        )
    }

    /// `airflow tasks list -S <file> <workflow>`
    pub fn list_tasks(&self, file: &RepoPath, workflow: &WorkflowName) -> CommandSpec {
        self.spec(SCHEDULER, ["tasks", "list", "-S", file.as_str(), workflow.as_str()])
    }

    /// `airflow test -dr -sd <workdir>/<file> <workflow> <task> <instant>`
    pub fn dry_run_test(
        &self,
        file: &RepoPath,
        workflow: &WorkflowName,
        task: &TaskName,
        instant: ReferenceInstant,
    ) -> CommandSpec {
        self.spec(
            SCHEDULER,
            [
                "test".to_string(),
                "-dr".to_string(),
                "-sd".to_string(),
                self.source_path(file).display().to_string(),
                workflow.to_string(),
                task.to_string(),
                instant.to_string(),
            ],
        )
    }

    /// `airflow render -sd <workdir>/<file> <workflow> <task> <instant>`
    pub fn dry_run_render(
        &self,
        file: &RepoPath,
        workflow: &WorkflowName,
        task: &TaskName,
        instant: ReferenceInstant,
    ) -> CommandSpec {
        self.spec(
            SCHEDULER,
            [
                "render".to_string(),
                "-sd".to_string(),
                self.source_path(file).display().to_string(),
                workflow.to_string(),
                task.to_string(),
                instant.to_string(),
            ],
        )
    }

    /// `flake8 --count --ignore=W191,E126 --max-line-length=160 <file>`
    pub fn flake8(&self, file: &RepoPath) -> CommandSpec {
        self.spec(
            FLAKE8,
            ["--count", "--ignore=W191,E126", MAX_LINE_LENGTH, file.as_str()],
        )
    }

    /// `pylint -E --max-line-length=160 <file>`
    pub fn pylint(&self, file: &RepoPath) -> CommandSpec {
        self.spec(PYLINT, ["-E", MAX_LINE_LENGTH, file.as_str()])
    }
}
