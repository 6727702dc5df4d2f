//! Dry-run verification of every task of a workflow.
//!
//! Each (workflow, task) pair moves through
//! `Pending -> TestIssued -> RenderIssued -> Evaluated`. The evaluations of
//! all tasks are folded into one flat list of codes per workflow; the
//! workflow fails if any code is non-zero. A failing task never stops the
//! remaining tasks from being evaluated.

use pipeline::{
    CommandRunner, GatePolicy, ProcessOutput, ReferenceInstant, RepoPath, TaskName, ToolCommands,
    Verdict, WorkflowName,
};
use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};

use crate::run_recorded;

/// Progress of one (workflow, task) pair.
#[derive(Debug, Clone, PartialEq)]
pub enum DryRunState {
    Pending,
    TestIssued {
        test: ProcessOutput,
    },
    RenderIssued {
        test: ProcessOutput,
        render: ProcessOutput,
    },
    Evaluated(TaskEvaluation),
}

/// Outcome of both dry-runs of one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskEvaluation {
    pub task: TaskName,
    /// The test dry-run printed the error marker or wrote to stderr.
    pub test_flagged: bool,
    /// The render dry-run printed the error marker or wrote to stderr.
    pub render_flagged: bool,
    pub test_exit: i32,
    pub render_exit: i32,
}

impl TaskEvaluation {
    /// `1` per flagged output, followed by both raw exit codes.
    pub fn codes(&self) -> Vec<i32> {
        let mut codes = Vec::with_capacity(4);
        if self.test_flagged {
            codes.push(1);
        }
        if self.render_flagged {
            codes.push(1);
        }
        codes.push(self.test_exit);
        codes.push(self.render_exit);
        codes
    }

    pub fn failed(&self) -> bool {
        self.codes().iter().any(|code| *code != 0)
    }
}

/// All task evaluations of one workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowDryRun {
    pub workflow: WorkflowName,
    pub tasks: Vec<TaskEvaluation>,
    /// Flat fold of every task's [`TaskEvaluation::codes`], in task order.
    pub codes: Vec<i32>,
}

impl WorkflowDryRun {
    pub fn verdict(&self) -> Verdict {
        Verdict::from_failure(self.codes.iter().any(|code| *code != 0))
    }
}

/// Issues the test and render dry-runs against the scheduler.
pub struct DryRunVerifier<'a> {
    runner: &'a dyn CommandRunner,
    commands: &'a ToolCommands,
    policy: &'a GatePolicy,
    instant: ReferenceInstant,
}

impl<'a> DryRunVerifier<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        commands: &'a ToolCommands,
        policy: &'a GatePolicy,
        instant: ReferenceInstant,
    ) -> Self {
        Self {
            runner,
            commands,
            policy,
            instant,
        }
    }

    /// Dry-runs every task of `workflow` in order.
    pub async fn verify_workflow(
        &self,
        file: &RepoPath,
        workflow: &WorkflowName,
        tasks: &[TaskName],
    ) -> WorkflowDryRun {
        let mut evaluations = Vec::with_capacity(tasks.len());
        let mut codes = Vec::with_capacity(tasks.len() * 4);

        for task in tasks {
            let span = info_span!("dry_run", dag = %workflow, task = %task);
            let evaluation = self.dry_run_task(file, workflow, task).instrument(span).await;
            codes.extend(evaluation.codes());
            evaluations.push(evaluation);
        }

        let result = WorkflowDryRun {
            workflow: workflow.clone(),
            tasks: evaluations,
            codes,
        };
        info!(dag = %workflow, codes = ?result.codes, verdict = %result.verdict(), "DAG dry-run finished");
        result
    }

    /// Drives one pair from `Pending` to `Evaluated`.
    pub async fn dry_run_task(
        &self,
        file: &RepoPath,
        workflow: &WorkflowName,
        task: &TaskName,
    ) -> TaskEvaluation {
        let mut state = DryRunState::Pending;
        loop {
            state = match state {
                DryRunState::Pending => {
                    let command = self.commands.dry_run_test(file, workflow, task, self.instant);
                    DryRunState::TestIssued {
                        test: run_recorded(self.runner, &command).await,
                    }
                }
                DryRunState::TestIssued { test } => {
                    let command = self
                        .commands
                        .dry_run_render(file, workflow, task, self.instant);
                    DryRunState::RenderIssued {
                        test,
                        render: run_recorded(self.runner, &command).await,
                    }
                }
                DryRunState::RenderIssued { test, render } => {
                    DryRunState::Evaluated(self.evaluate(task, &test, &render))
                }
                DryRunState::Evaluated(evaluation) => return evaluation,
            };
        }
    }

    fn evaluate(&self, task: &TaskName, test: &ProcessOutput, render: &ProcessOutput) -> TaskEvaluation {
        let evaluation = TaskEvaluation {
            task: task.clone(),
            test_flagged: self.log_output("test", test),
            render_flagged: self.log_output("render", render),
            test_exit: test.exit_code,
            render_exit: render.exit_code,
        };
        if evaluation.failed() {
            warn!(codes = ?evaluation.codes(), "task dry-run failed");
        }
        evaluation
    }

    /// Logs one dry-run's output and returns whether it is flagged.
    fn log_output(&self, mode: &str, output: &ProcessOutput) -> bool {
        let flagged = self.policy.output_indicates_failure(output);
        if flagged {
            warn!(
                mode,
                exit_code = output.exit_code,
                stdout = %output.stdout,
                stderr = %output.stderr,
                "dry-run reported errors"
            );
        } else {
            info!(mode, stdout = %output.stdout, "dry-run output");
        }
        flagged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pipeline::fakes::ScriptedRunner;

    fn file() -> RepoPath {
        RepoPath::new("PPADfoo.py").unwrap()
    }

    fn workflow() -> WorkflowName {
        WorkflowName::new("PPADfoo").unwrap()
    }

    fn tasks(names: &[&str]) -> Vec<TaskName> {
        names.iter().map(|n| TaskName::new(*n).unwrap()).collect()
    }

    fn instant() -> ReferenceInstant {
        ReferenceInstant::start_of(NaiveDate::from_ymd_opt(2024, 5, 6).unwrap())
    }

    async fn verify(runner: &ScriptedRunner, names: &[&str]) -> WorkflowDryRun {
        let commands = ToolCommands::new("/work");
        let policy = GatePolicy::default();
        DryRunVerifier::new(runner, &commands, &policy, instant())
            .verify_workflow(&file(), &workflow(), &tasks(names))
            .await
    }

    #[tokio::test]
    async fn test_clean_tasks_pass() {
        let runner = ScriptedRunner::new();
        let result = verify(&runner, &["extract", "load"]).await;

        assert_eq!(result.verdict(), Verdict::Passed);
        assert_eq!(result.codes, vec![0, 0, 0, 0]);
        assert_eq!(runner.count_matching("airflow test -dr"), 2);
        assert_eq!(runner.count_matching("airflow render"), 2);
    }

    #[tokio::test]
    async fn test_test_is_issued_before_render() {
        let runner = ScriptedRunner::new();
        verify(&runner, &["extract"]).await;

        let invocations = runner.invocations();
        assert_eq!(invocations[0].args[0], "test");
        assert_eq!(invocations[1].args[0], "render");
    }

    #[tokio::test]
    async fn test_failing_first_task_does_not_stop_second() {
        let runner = ScriptedRunner::new().on_exit("PPADfoo extract", 1);
        let result = verify(&runner, &["extract", "load"]).await;

        assert_eq!(result.verdict(), Verdict::Failed);
        assert_eq!(result.tasks.len(), 2);
        assert!(result.tasks[0].failed());
        assert!(!result.tasks[1].failed());
        assert_eq!(runner.count_matching("PPADfoo load"), 2);
    }

    #[tokio::test]
    async fn test_error_marker_fails_despite_zero_exit() {
        let runner = ScriptedRunner::new().on_stdout("airflow render", "ERROR - template failed");
        let result = verify(&runner, &["extract"]).await;

        assert_eq!(result.codes, vec![1, 0, 0]);
        assert_eq!(result.verdict(), Verdict::Failed);
    }

    #[tokio::test]
    async fn test_stderr_above_threshold_fails() {
        let runner = ScriptedRunner::new().on(
            "airflow test",
            ProcessOutput {
                stderr: "DeprecationWarning".to_string(),
                ..ProcessOutput::default()
            },
        );
        let result = verify(&runner, &["extract"]).await;
        assert!(result.tasks[0].test_flagged);
        assert_eq!(result.verdict(), Verdict::Failed);
    }

    #[tokio::test]
    async fn test_later_success_never_masks_failure() {
        let runner = ScriptedRunner::new().on_exit("PPADfoo first", 1);
        let result = verify(&runner, &["first", "second", "third"]).await;
        assert_eq!(result.verdict(), Verdict::Failed);
    }

    #[tokio::test]
    async fn test_dry_run_task_reaches_evaluated() {
        let runner = ScriptedRunner::new();
        let commands = ToolCommands::new("/work");
        let policy = GatePolicy::default();
        let verifier = DryRunVerifier::new(&runner, &commands, &policy, instant());
        let task = TaskName::new("extract").unwrap();

        let evaluation = verifier.dry_run_task(&file(), &workflow(), &task).await;
        assert_eq!(evaluation.task, task);
        assert_eq!(evaluation.codes(), vec![0, 0]);
    }
}
