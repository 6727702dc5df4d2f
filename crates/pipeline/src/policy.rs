//! House rules for workflow files and the interpretation of tool output.
//!
//! [`GatePolicy`] carries the fixed policy constants. Its methods are pure:
//! they take API data or captured [`ProcessOutput`] and either return the
//! values the next stage needs or a fatal [`GateError`].

use chrono::Duration;
use tracing::debug;

use crate::{
    ChangedFile, FileStatus, GateError, ProcessOutput, RepoPath, TaskName, TeamId, WorkflowName,
};

/// Prefix every workflow file base name and workflow identifier must carry.
pub const PROJECT_PREFIX: &str = "PPAD";

/// Extension of workflow source files.
pub const SOURCE_EXTENSION: &str = ".py";

/// Marker the scheduler prints when a command fails.
pub const ERROR_MARKER: &str = "ERROR";

/// Teams whose checkouts may legitimately miss files listed in the diff.
pub const SKIPPABLE_TEAMS: &[&str] = &["paz_radd_mo", "hrz_radd", "paz_dmp_do"];

/// Fixed policy constants of the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatePolicy {
    pub project_prefix: &'static str,
    pub source_extension: &'static str,
    pub error_marker: &'static str,
    /// Standard error longer than this many bytes marks a dry-run as failing.
    pub stderr_threshold: usize,
    /// Lines of preamble the task-listing command prints before task names.
    pub task_header_lines: usize,
    /// Schedules firing sooner than this after the reference instant are rejected.
    pub minimum_cadence_minutes: i64,
    pub skippable_teams: &'static [&'static str],
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            project_prefix: PROJECT_PREFIX,
            source_extension: SOURCE_EXTENSION,
            error_marker: ERROR_MARKER,
            stderr_threshold: 1,
            task_header_lines: 2,
            minimum_cadence_minutes: 30,
            skippable_teams: SKIPPABLE_TEAMS,
        }
    }
}

impl GatePolicy {
    /// Largest gap between the reference instant and the next fire time that
    /// is still rejected.
    pub fn rejected_gap(&self) -> Duration {
        Duration::minutes(self.minimum_cadence_minutes - 1)
    }

    /// Keeps the diff entries that are workflow files.
    ///
    /// A file is a workflow file when its base name starts with the project
    /// prefix and it was not removed. Every workflow file must carry the
    /// source extension.
    pub fn select_workflow_files(&self, files: &[ChangedFile]) -> Result<Vec<RepoPath>, GateError> {
        let mut selected = Vec::new();
        for file in files {
            let base_name = file.path.base_name();
            if file.status == FileStatus::Removed || !base_name.starts_with(self.project_prefix) {
                debug!(path = %file.path, status = ?file.status, "ignoring changed file");
                continue;
            }
            if !base_name.ends_with(self.source_extension) {
                return Err(GateError::InvalidFileExtension {
                    path: file.path.clone(),
                });
            }
            selected.push(file.path.clone());
        }
        Ok(selected)
    }

    /// Extracts workflow identifiers from the scheduler's listing output.
    pub fn extract_workflow_names(
        &self,
        file: &RepoPath,
        output: &ProcessOutput,
    ) -> Result<Vec<WorkflowName>, GateError> {
        if output.stdout.contains(self.error_marker) {
            return Err(GateError::WorkflowLoadFailed {
                file: file.clone(),
                output: output.stdout.clone(),
            });
        }

        let mut names = Vec::new();
        for line in output.stdout.lines() {
            if !line.starts_with(self.project_prefix) {
                continue;
            }
            if line.chars().any(char::is_whitespace) {
                return Err(GateError::MalformedWorkflowName {
                    name: line.to_string(),
                });
            }
            if line.contains(self.source_extension) {
                return Err(GateError::WorkflowNameHasExtension {
                    name: line.to_string(),
                });
            }
            // Non-empty: the line starts with the prefix.
            if let Some(name) = WorkflowName::new(line) {
                names.push(name);
            }
        }

        if names.is_empty() {
            return Err(GateError::NoWorkflowsDetected { file: file.clone() });
        }
        Ok(names)
    }

    /// Task identifiers: every output line after the header.
    ///
    /// Lines are trimmed and blank lines dropped, since a task identifier is
    /// never empty and is passed on as a single command argument.
    pub fn extract_task_names(&self, output: &ProcessOutput) -> Vec<TaskName> {
        output
            .stdout
            .lines()
            .skip(self.task_header_lines)
            .map(str::trim)
            .filter_map(TaskName::new)
            .collect()
    }

    /// Returns `true` if a dry-run's output marks it as failing, independently
    /// of its exit code.
    pub fn output_indicates_failure(&self, output: &ProcessOutput) -> bool {
        output.stdout.contains(self.error_marker) || output.stderr.len() > self.stderr_threshold
    }

    /// Returns `true` if a missing workflow file may be skipped for `team`.
    pub fn may_skip_missing_source(&self, team: &TeamId) -> bool {
        self.skippable_teams.contains(&team.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn changed(path: &str, status: FileStatus) -> ChangedFile {
        ChangedFile {
            path: RepoPath::new(path).unwrap(),
            status,
        }
    }

    fn stdout(text: &str) -> ProcessOutput {
        ProcessOutput {
            stdout: text.to_string(),
            ..ProcessOutput::default()
        }
    }

    fn file() -> RepoPath {
        RepoPath::new("dags/PPADfoo.py").unwrap()
    }

    #[test]
    fn test_select_keeps_prefixed_non_removed_files() {
        let policy = GatePolicy::default();
        let files = vec![
            changed("dags/PPADfoo.py", FileStatus::Modified),
            changed("dags/PPADold.py", FileStatus::Removed),
            changed("README.md", FileStatus::Added),
            changed("dags/helpers.py", FileStatus::Added),
            changed("PPADbar.py", FileStatus::Added),
        ];

        let selected = policy.select_workflow_files(&files).unwrap();
        let names: Vec<&str> = selected.iter().map(RepoPath::as_str).collect();
        assert_eq!(names, vec!["dags/PPADfoo.py", "PPADbar.py"]);
    }

    #[test]
    fn test_select_rejects_prefixed_non_python_file() {
        let policy = GatePolicy::default();
        let files = vec![changed("dags/PPADfoo.sql", FileStatus::Added)];
        let err = policy.select_workflow_files(&files).unwrap_err();
        assert!(matches!(err, GateError::InvalidFileExtension { .. }));
    }

    #[test]
    fn test_select_ignores_removed_non_python_file() {
        let policy = GatePolicy::default();
        let files = vec![changed("dags/PPADfoo.sql", FileStatus::Removed)];
        assert!(policy.select_workflow_files(&files).unwrap().is_empty());
    }

    #[test]
    fn test_select_uses_base_name_not_directory() {
        let policy = GatePolicy::default();
        let files = vec![changed("PPADdir/helpers.py", FileStatus::Added)];
        assert!(policy.select_workflow_files(&files).unwrap().is_empty());
    }

    #[test]
    fn test_extract_workflow_names_filters_by_prefix() {
        let policy = GatePolicy::default();
        let output = stdout("dag_id\n======\nPPADfoo\nsomething_else\nPPADfoo_hourly");
        let names = policy.extract_workflow_names(&file(), &output).unwrap();
        let names: Vec<&str> = names.iter().map(WorkflowName::as_str).collect();
        assert_eq!(names, vec!["PPADfoo", "PPADfoo_hourly"]);
    }

    #[test]
    fn test_extract_workflow_names_rejects_whitespace() {
        let policy = GatePolicy::default();
        let err = policy
            .extract_workflow_names(&file(), &stdout("PPAD foo"))
            .unwrap_err();
        assert!(matches!(err, GateError::MalformedWorkflowName { .. }));
    }

    #[test]
    fn test_extract_workflow_names_rejects_extension() {
        let policy = GatePolicy::default();
        let err = policy
            .extract_workflow_names(&file(), &stdout("PPADfoo.py"))
            .unwrap_err();
        assert!(matches!(err, GateError::WorkflowNameHasExtension { .. }));

        let err = policy
            .extract_workflow_names(&file(), &stdout("PPADfoo.pyramid"))
            .unwrap_err();
        assert!(matches!(err, GateError::WorkflowNameHasExtension { .. }));
    }

    #[test]
    fn test_extract_workflow_names_error_marker_is_fatal() {
        let policy = GatePolicy::default();
        let err = policy
            .extract_workflow_names(&file(), &stdout("PPADfoo\nERROR - broken import"))
            .unwrap_err();
        assert!(matches!(err, GateError::WorkflowLoadFailed { .. }));
    }

    #[test]
    fn test_extract_workflow_names_empty_is_fatal() {
        let policy = GatePolicy::default();
        for text in ["", "other_dag\nanother"] {
            let err = policy
                .extract_workflow_names(&file(), &stdout(text))
                .unwrap_err();
            assert!(matches!(err, GateError::NoWorkflowsDetected { .. }));
        }
    }

    #[test]
    fn test_extract_task_names_skips_header() {
        let policy = GatePolicy::default();
        let tasks = policy.extract_task_names(&stdout("[2024-01-01] INFO loading\nheader\nextract\nload"));
        let tasks: Vec<&str> = tasks.iter().map(TaskName::as_str).collect();
        assert_eq!(tasks, vec!["extract", "load"]);
    }

    #[test]
    fn test_extract_task_names_trims_and_drops_blank_lines() {
        let policy = GatePolicy::default();
        let tasks = policy.extract_task_names(&stdout("header\n-----\n  extract \n\n\tload\n"));
        let tasks: Vec<&str> = tasks.iter().map(TaskName::as_str).collect();
        assert_eq!(tasks, vec!["extract", "load"]);
    }

    #[test]
    fn test_output_failure_markers() {
        let policy = GatePolicy::default();
        assert!(!policy.output_indicates_failure(&stdout("all good")));
        assert!(policy.output_indicates_failure(&stdout("ERROR - task failed")));

        let short_stderr = ProcessOutput {
            stderr: "\n".to_string(),
            ..ProcessOutput::default()
        };
        assert!(!policy.output_indicates_failure(&short_stderr));

        let real_stderr = ProcessOutput {
            stderr: "Traceback".to_string(),
            ..ProcessOutput::default()
        };
        assert!(policy.output_indicates_failure(&real_stderr));
    }

    #[test]
    fn test_skippable_teams() {
        let policy = GatePolicy::default();
        assert!(policy.may_skip_missing_source(&TeamId::new("hrz_radd").unwrap()));
        assert!(!policy.may_skip_missing_source(&TeamId::new("sales").unwrap()));
    }

    #[test]
    fn test_rejected_gap_is_one_below_cadence() {
        assert_eq!(GatePolicy::default().rejected_gap(), Duration::minutes(29));
    }
}
