//! End-to-end gate runs against in-memory ports and a temporary checkout.

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use nodes::GateExecutor;
use pipeline::fakes::{FakeVersionControl, ScriptedRunner, VcsCall};
use pipeline::{
    GateError, GateOutcome, ReferenceInstant, TeamId, UserLogin, ValidationResult, Verdict,
};

const DAILY_DAG: &str = r#"
from datetime import datetime
from airflow import DAG

default_args = {
    "owner": "sales",
    "start_date": datetime(2023, 1, 1),
}

dag = DAG("PPADfoo", schedule_interval="@daily", default_args=default_args)
"#;

const TEN_MINUTE_DAG: &str = r#"
default_args = {"start_date": datetime(2023, 1, 1)}
dag = DAG("PPADfoo", schedule_interval="*/10 * * * *", default_args=default_args)
"#;

fn team(name: &str) -> TeamId {
    TeamId::new(name).unwrap()
}

fn user() -> UserLogin {
    UserLogin::new("alice").unwrap()
}

fn reference() -> ReferenceInstant {
    ReferenceInstant::start_of(NaiveDate::from_ymd_opt(2024, 5, 6).unwrap())
}

fn checkout(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, contents) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }
    dir
}

fn one_pull_request(commits: usize, files: &[(&str, &str)]) -> Arc<FakeVersionControl> {
    Arc::new(
        FakeVersionControl::new()
            .with_pull_request(11, "bob", "open", 1)
            .with_pull_request(12, "alice", "open", commits)
            .with_files(12, files),
    )
}

fn healthy_scheduler() -> ScriptedRunner {
    ScriptedRunner::new()
        .on_stdout("dags list", "PPADfoo")
        .on_stdout("tasks list", "header\n-----\nextract")
}

fn executor(
    vcs: &Arc<FakeVersionControl>,
    runner: &Arc<ScriptedRunner>,
    workdir: &Path,
) -> GateExecutor {
    GateExecutor::new(vcs.clone(), runner.clone(), workdir).with_reference(reference())
}

fn completed(outcome: GateOutcome) -> Vec<ValidationResult> {
    match outcome {
        GateOutcome::Completed(report) => report.files,
        other => panic!("expected a completed run, got {other:?}"),
    }
}

#[tokio::test]
async fn test_single_clean_file_passes() {
    let dir = checkout(&[("PPADfoo.py", DAILY_DAG)]);
    let vcs = one_pull_request(1, &[("PPADfoo.py", "added")]);
    let runner = Arc::new(healthy_scheduler());

    let outcome = executor(&vcs, &runner, dir.path())
        .run(&team("sales"), &user())
        .await
        .unwrap();

    assert_eq!(outcome.verdict(), Verdict::Passed);
    let files = completed(outcome);
    assert_eq!(
        files[0].labels(),
        vec![
            "PPADfoo.py",
            "PPADfoo",
            "Flake8 Syntax TEST - PASSED",
            "PyLint Syntax TEST - PASSED",
            "AirFlow DAG Test - PASSED",
        ]
    );
    assert_eq!(runner.count_matching("airflow test -dr"), 1);
    assert_eq!(runner.count_matching("airflow render"), 1);
}

#[tokio::test]
async fn test_unsquashed_pull_request_stops_after_commit_check() {
    let dir = checkout(&[("PPADfoo.py", DAILY_DAG)]);
    let vcs = one_pull_request(2, &[("PPADfoo.py", "added")]);
    let runner = Arc::new(healthy_scheduler());

    let err = executor(&vcs, &runner, dir.path())
        .run(&team("sales"), &user())
        .await
        .unwrap_err();

    assert!(matches!(err, GateError::UnsquashedCommits { count: 2, .. }));
    assert!(matches!(
        vcs.calls().as_slice(),
        [VcsCall::ListPullRequests, VcsCall::ListCommits(_)]
    ));
    assert!(runner.invocations().is_empty());
}

#[tokio::test]
async fn test_short_cadence_is_rejected_before_any_command() {
    let dir = checkout(&[("PPADfoo.py", TEN_MINUTE_DAG)]);
    let vcs = one_pull_request(1, &[("PPADfoo.py", "modified")]);
    let runner = Arc::new(healthy_scheduler());

    let err = executor(&vcs, &runner, dir.path())
        .run(&team("sales"), &user())
        .await
        .unwrap_err();

    assert!(matches!(err, GateError::CadenceTooShort { .. }));
    assert_eq!(runner.count_matching("airflow test"), 0);
    assert!(runner.invocations().is_empty());
}

#[tokio::test]
async fn test_one_failing_task_fails_the_workflow() {
    let dir = checkout(&[("PPADfoo.py", DAILY_DAG)]);
    let vcs = one_pull_request(1, &[("PPADfoo.py", "modified")]);
    let runner = Arc::new(
        ScriptedRunner::new()
            .on_exit("PPADfoo task_2", 1)
            .on_stdout("dags list", "PPADfoo")
            .on_stdout("tasks list", "header\n-----\ntask_1\ntask_2"),
    );

    let outcome = executor(&vcs, &runner, dir.path())
        .run(&team("sales"), &user())
        .await
        .unwrap();

    assert_eq!(outcome.verdict(), Verdict::Failed);
    let files = completed(outcome);
    assert!(files[0]
        .labels()
        .contains(&"AirFlow DAG Test - FAILED".to_string()));
    assert_eq!(runner.count_matching("PPADfoo task_1"), 2);
    assert_eq!(runner.count_matching("PPADfoo task_2"), 2);
}

#[tokio::test]
async fn test_no_workflow_files_exits_cleanly_without_enumeration() {
    let dir = checkout(&[]);
    let vcs = one_pull_request(
        1,
        &[("README.md", "modified"), ("PPADold.py", "removed")],
    );
    let runner = Arc::new(healthy_scheduler());

    let outcome = executor(&vcs, &runner, dir.path())
        .run(&team("sales"), &user())
        .await
        .unwrap();

    assert!(matches!(outcome, GateOutcome::NothingToValidate { .. }));
    assert_eq!(outcome.verdict(), Verdict::Passed);
    assert!(runner.invocations().is_empty());
}

#[tokio::test]
async fn test_missing_pull_request_is_fatal() {
    let dir = checkout(&[]);
    let vcs = Arc::new(FakeVersionControl::new().with_pull_request(11, "bob", "open", 1));
    let runner = Arc::new(healthy_scheduler());

    let err = executor(&vcs, &runner, dir.path())
        .run(&team("sales"), &user())
        .await
        .unwrap_err();
    assert!(matches!(err, GateError::PullRequestNotFound { .. }));
    assert_eq!(vcs.calls(), vec![VcsCall::ListPullRequests]);
}

#[tokio::test]
async fn test_lint_failure_fails_the_run() {
    let dir = checkout(&[("PPADfoo.py", DAILY_DAG)]);
    let vcs = one_pull_request(1, &[("PPADfoo.py", "modified")]);
    let runner = Arc::new(healthy_scheduler().on_exit("flake8", 1));

    let outcome = executor(&vcs, &runner, dir.path())
        .run(&team("sales"), &user())
        .await
        .unwrap();

    assert_eq!(outcome.verdict(), Verdict::Failed);
    // Dry-runs still happen after a lint failure.
    assert_eq!(runner.count_matching("airflow render"), 1);
}

#[tokio::test]
async fn test_failure_in_first_file_is_not_masked_by_second() {
    let dir = checkout(&[("dags/PPADbad.py", DAILY_DAG), ("dags/PPADgood.py", DAILY_DAG)]);
    let vcs = one_pull_request(
        1,
        &[("dags/PPADbad.py", "added"), ("dags/PPADgood.py", "added")],
    );
    let runner = Arc::new(
        ScriptedRunner::new()
            .on_stdout("tasks list", "header\n-----\nextract")
            .on_stdout("dags list -o json -S ./dags/PPADbad.py", "PPADbad")
            .on_stdout("dags list -o json -S ./dags/PPADgood.py", "PPADgood")
            .on_exit("dags/PPADbad.py PPADbad", 1),
    );

    let outcome = executor(&vcs, &runner, dir.path())
        .run(&team("sales"), &user())
        .await
        .unwrap();

    assert_eq!(outcome.verdict(), Verdict::Failed);
    let files = completed(outcome);
    assert!(files[0].has_failures());
    assert!(!files[1].has_failures());
}

#[tokio::test]
async fn test_malformed_workflow_name_is_fatal() {
    let dir = checkout(&[("PPADfoo.py", DAILY_DAG)]);
    let vcs = one_pull_request(1, &[("PPADfoo.py", "added")]);
    let runner = Arc::new(ScriptedRunner::new().on_stdout("dags list", "PPADfoo.py"));

    let err = executor(&vcs, &runner, dir.path())
        .run(&team("sales"), &user())
        .await
        .unwrap_err();
    assert!(matches!(err, GateError::WorkflowNameHasExtension { .. }));
    assert_eq!(runner.count_matching("flake8"), 0);
}

#[tokio::test]
async fn test_missing_file_is_skipped_for_allow_listed_team() {
    let dir = checkout(&[("PPADfoo.py", DAILY_DAG)]);
    let vcs = one_pull_request(
        1,
        &[("dags/PPADelsewhere.py", "added"), ("PPADfoo.py", "added")],
    );
    let runner = Arc::new(healthy_scheduler());

    let outcome = executor(&vcs, &runner, dir.path())
        .run(&team("hrz_radd"), &user())
        .await
        .unwrap();

    assert_eq!(outcome.verdict(), Verdict::Passed);
    match outcome {
        GateOutcome::Completed(report) => {
            assert_eq!(report.skipped.len(), 1);
            assert_eq!(report.files.len(), 1);
        }
        other => panic!("expected a completed run, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_file_is_fatal_for_other_teams() {
    let dir = checkout(&[]);
    let vcs = one_pull_request(1, &[("dags/PPADelsewhere.py", "added")]);
    let runner = Arc::new(healthy_scheduler());

    let err = executor(&vcs, &runner, dir.path())
        .run(&team("sales"), &user())
        .await
        .unwrap_err();
    assert!(err.is_source_missing());
}

#[tokio::test]
async fn test_repeated_runs_reach_the_same_verdict() {
    let dir = checkout(&[("PPADfoo.py", DAILY_DAG)]);
    let vcs = one_pull_request(1, &[("PPADfoo.py", "added")]);
    let runner = Arc::new(healthy_scheduler().on_exit("airflow render", 1));
    let gate = executor(&vcs, &runner, dir.path());

    let first = gate.run(&team("sales"), &user()).await.unwrap();
    let second = gate.run(&team("sales"), &user()).await.unwrap();
    assert_eq!(first.verdict(), Verdict::Failed);
    assert_eq!(first.verdict(), second.verdict());
}
