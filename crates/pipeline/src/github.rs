//! Version-control port.
//!
//! The pipeline reads three things from the hosting service: the pull
//! requests of a team repository, the commits of one pull request, and the
//! file diff of a commit. [`VersionControl`] is the seam; the `github` crate
//! supplies the HTTP implementation and [`crate::fakes`] an in-memory one.

use async_trait::async_trait;

use crate::{ChangedFile, CommitSha, GatewayError, PullRequestNumber, PullRequestRef, TeamId};

/// Read access to the team repositories of the scheduler organisation.
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Lists pull requests of `team`'s repository in API order.
    async fn list_pull_requests(&self, team: &TeamId) -> Result<Vec<PullRequestRef>, GatewayError>;

    /// Lists the commits of one pull request, oldest first.
    async fn list_commits(
        &self,
        team: &TeamId,
        number: PullRequestNumber,
    ) -> Result<Vec<CommitSha>, GatewayError>;

    /// Returns the file diff of a single commit.
    async fn commit_files(
        &self,
        team: &TeamId,
        sha: &CommitSha,
    ) -> Result<Vec<ChangedFile>, GatewayError>;
}
