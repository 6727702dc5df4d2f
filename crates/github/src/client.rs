//! HTTP client for the version-control API.

use std::time::Duration;

use async_trait::async_trait;
use pipeline::{
    ChangedFile, CommitSha, GatewayError, PullRequestNumber, PullRequestRef, TeamId,
    VersionControl,
};
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::dto::{CommitDto, CommitEntryDto, PullDto};

/// Public GitHub API root.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Organisation owning one repository per team.
pub const DEFAULT_ORG: &str = "airflow";

/// Ceiling on every request, connection included.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(3);

const MEDIA_TYPE: &str = "application/vnd.github+json";
const AGENT: &str = "dag-gate";

/// Connection settings for [`GithubClient`].
#[derive(Debug, Clone)]
pub struct GithubConfig {
    pub api_url: String,
    pub org: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl GithubConfig {
    pub fn new(api_url: impl Into<String>, org: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            org: org.into(),
            token: None,
            timeout: HTTP_TIMEOUT,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL, DEFAULT_ORG)
    }
}

/// [`VersionControl`] over the GitHub REST API.
///
/// Each call is a single GET; there are no retries.
pub struct GithubClient {
    http: reqwest::Client,
    base: String,
    org: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(config: GithubConfig) -> Result<Self, GatewayError> {
        let base = config.api_url.trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Request {
                url: base.clone(),
                message: format!("http client error: {e}"),
            })?;
        Ok(Self {
            http,
            base,
            org: config.org,
            token: config.token,
        })
    }

    fn repo_url(&self, team: &TeamId, tail: &str) -> String {
        format!("{}/repos/{}/{}/{}", self.base, self.org, team, tail)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, GatewayError> {
        let mut request = self
            .http
            .get(url)
            .header(USER_AGENT, AGENT)
            .header(ACCEPT, MEDIA_TYPE);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| classify(url, e))?;
        let status = response.status();
        if !status.is_success() {
            let error = GatewayError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            };
            warn!(category = "http_status", %error, "version-control request failed");
            return Err(error);
        }

        let body = response.text().await.map_err(|e| classify(url, e))?;
        serde_json::from_str(&body).map_err(|e| {
            let error = GatewayError::Decode {
                url: url.to_string(),
                message: e.to_string(),
            };
            warn!(category = "decode", %error, "version-control response rejected");
            error
        })
    }
}

/// Maps a transport failure to its [`GatewayError`] category.
fn classify(url: &str, error: reqwest::Error) -> GatewayError {
    let url = url.to_string();
    let (category, error) = if error.is_timeout() {
        ("timeout", GatewayError::Timeout { url })
    } else if error.is_connect() {
        (
            "connect",
            GatewayError::Connect {
                url,
                message: error.to_string(),
            },
        )
    } else if error.is_decode() {
        (
            "decode",
            GatewayError::Decode {
                url,
                message: error.to_string(),
            },
        )
    } else {
        (
            "request",
            GatewayError::Request {
                url,
                message: error.to_string(),
            },
        )
    };
    warn!(category, %error, "version-control request failed");
    error
}

#[async_trait]
impl VersionControl for GithubClient {
    #[instrument(skip_all, fields(team = %team))]
    async fn list_pull_requests(&self, team: &TeamId) -> Result<Vec<PullRequestRef>, GatewayError> {
        let url = self.repo_url(team, "pulls");
        let pulls: Vec<PullDto> = self.get_json(&url).await?;
        debug!(count = pulls.len(), "pull requests fetched");
        pulls.into_iter().map(|p| p.into_domain(&url)).collect()
    }

    #[instrument(skip_all, fields(team = %team, number = %number))]
    async fn list_commits(
        &self,
        team: &TeamId,
        number: PullRequestNumber,
    ) -> Result<Vec<CommitSha>, GatewayError> {
        let url = self.repo_url(team, &format!("pulls/{number}/commits"));
        let commits: Vec<CommitEntryDto> = self.get_json(&url).await?;
        commits.into_iter().map(|c| c.into_domain(&url)).collect()
    }

    #[instrument(skip_all, fields(team = %team, sha = %sha))]
    async fn commit_files(
        &self,
        team: &TeamId,
        sha: &CommitSha,
    ) -> Result<Vec<ChangedFile>, GatewayError> {
        let url = self.repo_url(team, &format!("commits/{sha}"));
        let commit: CommitDto = self.get_json(&url).await?;
        commit.files.into_iter().map(|f| f.into_domain(&url)).collect()
    }
}
