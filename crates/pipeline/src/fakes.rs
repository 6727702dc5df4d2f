//! In-memory implementations of the port traits for tests.
//!
//! Both fakes record every call so tests can assert not only what the
//! pipeline decided but also which external calls it did (or did not) make.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    ChangedFile, CommandRunner, CommandSpec, CommitSha, FileStatus, GatewayError, ProcessOutput,
    PullRequestNumber, PullRequestRef, PullRequestState, RepoPath, TeamId, UserLogin,
    VersionControl,
};

/// A call observed by [`FakeVersionControl`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcsCall {
    ListPullRequests,
    ListCommits(PullRequestNumber),
    CommitFiles(CommitSha),
}

/// Serves canned pull requests, commit lists and diffs.
#[derive(Debug, Default)]
pub struct FakeVersionControl {
    pulls: Vec<PullRequestRef>,
    commits: HashMap<PullRequestNumber, Vec<CommitSha>>,
    files: HashMap<String, Vec<ChangedFile>>,
    failure: Option<GatewayError>,
    calls: Mutex<Vec<VcsCall>>,
}

impl FakeVersionControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a pull request with `commit_count` commits; the last one is the head.
    pub fn with_pull_request(
        mut self,
        number: u64,
        author: &str,
        state: &str,
        commit_count: usize,
    ) -> Self {
        let number = PullRequestNumber::new(number);
        // Always mint at least one SHA so the pull request has a head.
        let commits: Vec<CommitSha> = (0..commit_count.max(1))
            .map(|i| CommitSha::new(format!("sha-{number}-{i}")).expect("non-empty sha"))
            .collect();
        let head_sha = commits[commits.len() - 1].clone();
        self.pulls.push(PullRequestRef {
            number,
            head_sha,
            author: UserLogin::new(author).expect("author must not be empty"),
            state: PullRequestState::from_api(state),
        });
        self.commits
            .insert(number, commits.into_iter().take(commit_count).collect());
        self
    }

    /// Sets the diff of the head commit of pull request `number`.
    pub fn with_files(mut self, number: u64, files: &[(&str, &str)]) -> Self {
        let number = PullRequestNumber::new(number);
        if let Some(pull) = self.pulls.iter().find(|p| p.number == number) {
            let files = files
                .iter()
                .map(|(path, status)| ChangedFile {
                    path: RepoPath::new(*path).expect("path must not be empty"),
                    status: FileStatus::from_api(status),
                })
                .collect();
            self.files.insert(pull.head_sha.to_string(), files);
        }
        self
    }

    /// Makes every call fail with `error`.
    pub fn failing_with(mut self, error: GatewayError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Calls observed so far, in order.
    pub fn calls(&self) -> Vec<VcsCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: VcsCall) -> Result<(), GatewayError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl VersionControl for FakeVersionControl {
    async fn list_pull_requests(&self, _team: &TeamId) -> Result<Vec<PullRequestRef>, GatewayError> {
        self.record(VcsCall::ListPullRequests)?;
        Ok(self.pulls.clone())
    }

    async fn list_commits(
        &self,
        _team: &TeamId,
        number: PullRequestNumber,
    ) -> Result<Vec<CommitSha>, GatewayError> {
        self.record(VcsCall::ListCommits(number))?;
        Ok(self.commits.get(&number).cloned().unwrap_or_default())
    }

    async fn commit_files(
        &self,
        _team: &TeamId,
        sha: &CommitSha,
    ) -> Result<Vec<ChangedFile>, GatewayError> {
        self.record(VcsCall::CommitFiles(sha.clone()))?;
        Ok(self.files.get(sha.as_str()).cloned().unwrap_or_default())
    }
}

/// Answers commands from a script of `(pattern, output)` rules.
///
/// A rule matches when the command line contains its pattern; the first
/// matching rule wins. Unmatched commands succeed with empty output.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    rules: Vec<(String, Result<ProcessOutput, GatewayError>)>,
    invocations: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers commands containing `pattern` with `output`.
    pub fn on(mut self, pattern: &str, output: ProcessOutput) -> Self {
        self.rules.push((pattern.to_string(), Ok(output)));
        self
    }

    /// Answers commands containing `pattern` with exit code 0 and `stdout`.
    pub fn on_stdout(self, pattern: &str, stdout: &str) -> Self {
        self.on(
            pattern,
            ProcessOutput {
                stdout: stdout.to_string(),
                ..ProcessOutput::default()
            },
        )
    }

    /// Answers commands containing `pattern` with `exit_code` and no output.
    pub fn on_exit(self, pattern: &str, exit_code: i32) -> Self {
        self.on(
            pattern,
            ProcessOutput {
                exit_code,
                ..ProcessOutput::default()
            },
        )
    }

    /// Fails commands containing `pattern` as if the program could not start.
    pub fn on_spawn_failure(mut self, pattern: &str) -> Self {
        self.rules.push((
            pattern.to_string(),
            Err(GatewayError::Spawn {
                program: pattern.to_string(),
                message: "No such file or directory".to_string(),
            }),
        ));
        self
    }

    /// Every command run so far, in order.
    pub fn invocations(&self) -> Vec<CommandSpec> {
        self.invocations.lock().map(|i| i.clone()).unwrap_or_default()
    }

    /// Number of commands whose command line contains `pattern`.
    pub fn count_matching(&self, pattern: &str) -> usize {
        self.invocations()
            .iter()
            .filter(|c| c.command_line().contains(pattern))
            .count()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, command: &CommandSpec) -> Result<ProcessOutput, GatewayError> {
        if let Ok(mut invocations) = self.invocations.lock() {
            invocations.push(command.clone());
        }
        let line = command.command_line();
        self.rules
            .iter()
            .find(|(pattern, _)| line.contains(pattern.as_str()))
            .map(|(_, result)| result.clone())
            .unwrap_or_else(|| Ok(ProcessOutput::default()))
    }
}
