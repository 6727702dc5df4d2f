//! Pull-request resolution, squash enforcement and workflow-file discovery.

use pipeline::{
    GateError, GatePolicy, PullRequestRef, RepoPath, TeamId, UserLogin, VersionControl,
};
use tracing::{info, instrument, warn};

/// Finds the open pull request authored by `user`.
///
/// Pull requests are scanned in API order and the first match wins. When
/// none matches, the error lists every open pull request's author.
#[instrument(skip_all, fields(team = %team, user = %user))]
pub async fn resolve_pull_request(
    vcs: &dyn VersionControl,
    team: &TeamId,
    user: &UserLogin,
) -> Result<PullRequestRef, GateError> {
    let pulls = vcs.list_pull_requests(team).await?;

    for pull in &pulls {
        info!(number = %pull.number, head_sha = %pull.head_sha, "inspecting pull request");
        if pull.state.is_open() && &pull.author == user {
            info!(number = %pull.number, head_sha = %pull.head_sha, "resolved pull request");
            return Ok(pull.clone());
        }
    }

    let open_authors: Vec<String> = pulls
        .iter()
        .filter(|p| p.state.is_open())
        .map(|p| p.author.to_string())
        .collect();
    warn!(?open_authors, "no open pull request from submitting user");
    Err(GateError::PullRequestNotFound {
        team: team.clone(),
        user: user.clone(),
        open_authors,
    })
}

/// Enforces the single-commit policy.
#[instrument(skip_all, fields(number = %pull.number))]
pub async fn check_squash(
    vcs: &dyn VersionControl,
    team: &TeamId,
    pull: &PullRequestRef,
) -> Result<(), GateError> {
    let commits = vcs.list_commits(team, pull.number).await?;
    if commits.len() > 1 {
        warn!(count = commits.len(), "pull request is not squashed");
        return Err(GateError::UnsquashedCommits {
            count: commits.len(),
            head_sha: pull.head_sha.clone(),
        });
    }
    info!("single commit - PASSED");
    Ok(())
}

/// Lists the workflow files changed by the head commit.
///
/// An empty result is not an error: the caller treats it as nothing to
/// validate.
#[instrument(skip_all, fields(head_sha = %pull.head_sha))]
pub async fn discover_workflow_files(
    vcs: &dyn VersionControl,
    team: &TeamId,
    pull: &PullRequestRef,
    policy: &GatePolicy,
) -> Result<Vec<RepoPath>, GateError> {
    let changed = vcs.commit_files(team, &pull.head_sha).await?;
    let selected = policy.select_workflow_files(&changed)?;
    if selected.is_empty() {
        info!(
            changed = changed.len(),
            "no DAG files found in pull request; non-DAG changes need a manual review"
        );
    } else {
        let files: Vec<&str> = selected.iter().map(RepoPath::as_str).collect();
        info!(?files, "DAG files found");
    }
    Ok(selected)
}
