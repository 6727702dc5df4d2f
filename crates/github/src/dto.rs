//! Wire shapes of the GitHub responses. Only the fields the gate reads are
//! declared; everything else in the payload is ignored.

use pipeline::{
    ChangedFile, CommitSha, FileStatus, GatewayError, PullRequestNumber, PullRequestRef,
    PullRequestState, RepoPath, UserLogin,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct PullDto {
    pub number: u64,
    pub state: String,
    pub head: HeadDto,
    pub user: UserDto,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HeadDto {
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserDto {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommitEntryDto {
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommitDto {
    #[serde(default)]
    pub files: Vec<FileDto>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FileDto {
    pub filename: String,
    pub status: String,
}

fn missing(url: &str, field: &str) -> GatewayError {
    GatewayError::Decode {
        url: url.to_string(),
        message: format!("field '{field}' is empty"),
    }
}

impl PullDto {
    pub fn into_domain(self, url: &str) -> Result<PullRequestRef, GatewayError> {
        Ok(PullRequestRef {
            number: PullRequestNumber::new(self.number),
            head_sha: CommitSha::new(self.head.sha).ok_or_else(|| missing(url, "head.sha"))?,
            author: UserLogin::new(self.user.login).ok_or_else(|| missing(url, "user.login"))?,
            state: PullRequestState::from_api(&self.state),
        })
    }
}

impl CommitEntryDto {
    pub fn into_domain(self, url: &str) -> Result<CommitSha, GatewayError> {
        CommitSha::new(self.sha).ok_or_else(|| missing(url, "sha"))
    }
}

impl FileDto {
    pub fn into_domain(self, url: &str) -> Result<ChangedFile, GatewayError> {
        Ok(ChangedFile {
            path: RepoPath::new(self.filename).ok_or_else(|| missing(url, "filename"))?,
            status: FileStatus::from_api(&self.status),
        })
    }
}
