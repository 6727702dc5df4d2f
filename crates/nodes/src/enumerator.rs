//! Workflow and task enumeration through the scheduler CLI.

use pipeline::{
    CommandRunner, GateError, GatePolicy, RepoPath, TaskName, ToolCommands, WorkflowName,
};
use tracing::{debug, info, instrument};

/// Lists the workflows defined in `file`.
///
/// Malformed identifiers, scheduler errors and empty listings are fatal.
#[instrument(skip_all, fields(file = %file))]
pub async fn list_workflows(
    runner: &dyn CommandRunner,
    commands: &ToolCommands,
    policy: &GatePolicy,
    file: &RepoPath,
) -> Result<Vec<WorkflowName>, GateError> {
    let output = runner.run(&commands.list_workflows(file)).await?;
    if !output.stderr.is_empty() {
        debug!(stderr = %output.stderr, "scheduler stderr while listing DAGs");
    }

    let workflows = policy.extract_workflow_names(file, &output)?;
    let names: Vec<&str> = workflows.iter().map(WorkflowName::as_str).collect();
    info!(dags = ?names, "DAGs detected");
    Ok(workflows)
}

/// Lists the tasks of `workflow`. A workflow without tasks is fatal.
#[instrument(skip_all, fields(file = %file, dag = %workflow))]
pub async fn list_tasks(
    runner: &dyn CommandRunner,
    commands: &ToolCommands,
    policy: &GatePolicy,
    file: &RepoPath,
    workflow: &WorkflowName,
) -> Result<Vec<TaskName>, GateError> {
    let output = runner.run(&commands.list_tasks(file, workflow)).await?;
    let tasks = policy.extract_task_names(&output);
    if tasks.is_empty() {
        return Err(GateError::NoTasksDetected {
            file: file.clone(),
            workflow: workflow.clone(),
        });
    }

    let names: Vec<&str> = tasks.iter().map(TaskName::as_str).collect();
    info!(tasks = ?names, "tasks detected");
    Ok(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline::fakes::ScriptedRunner;
    use pipeline::GatewayError;

    fn file() -> RepoPath {
        RepoPath::new("PPADfoo.py").unwrap()
    }

    fn workflow() -> WorkflowName {
        WorkflowName::new("PPADfoo").unwrap()
    }

    #[tokio::test]
    async fn test_lists_prefixed_workflows() {
        let runner = ScriptedRunner::new().on_stdout("dags list", "PPADfoo\nPPADfoo_backfill\nnoise");
        let workflows = list_workflows(
            &runner,
            &ToolCommands::new("."),
            &GatePolicy::default(),
            &file(),
        )
        .await
        .unwrap();
        assert_eq!(workflows.len(), 2);
    }

    #[tokio::test]
    async fn test_spawn_failure_is_fatal() {
        let runner = ScriptedRunner::new().on_spawn_failure("dags list");
        let err = list_workflows(
            &runner,
            &ToolCommands::new("."),
            &GatePolicy::default(),
            &file(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GateError::Gateway(GatewayError::Spawn { .. })));
    }

    #[tokio::test]
    async fn test_lists_tasks_after_header() {
        let runner = ScriptedRunner::new().on_stdout("tasks list", "line one\nline two\nextract\nload");
        let tasks = list_tasks(
            &runner,
            &ToolCommands::new("."),
            &GatePolicy::default(),
            &file(),
            &workflow(),
        )
        .await
        .unwrap();
        let names: Vec<&str> = tasks.iter().map(TaskName::as_str).collect();
        assert_eq!(names, vec!["extract", "load"]);
    }

    #[tokio::test]
    async fn test_workflow_without_tasks_is_fatal() {
        let runner = ScriptedRunner::new().on_stdout("tasks list", "line one\nline two");
        let err = list_tasks(
            &runner,
            &ToolCommands::new("."),
            &GatePolicy::default(),
            &file(),
            &workflow(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GateError::NoTasksDetected { .. }));
    }
}
