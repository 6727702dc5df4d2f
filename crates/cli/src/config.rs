//! Command-line configuration.
//!
//! Every option can also come from the environment so the gate can run
//! unchanged inside a CI container.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use github::{GithubConfig, DEFAULT_API_URL, DEFAULT_ORG};
use pipeline::{TeamId, UserLogin};

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "dag-gate")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Validates the DAG files of a pull request before it is merged", long_about = None)]
pub struct Args {
    /// Team repository; a path or file name is reduced to its base name
    pub team: String,

    /// Login of the pull request author
    pub user: String,

    /// Root of the version-control API
    #[arg(long, env = "DAG_GATE_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Organisation that owns the team repositories
    #[arg(long, env = "DAG_GATE_ORG", default_value = DEFAULT_ORG)]
    pub org: String,

    /// API token sent as a bearer credential
    #[arg(long, env = "DAG_GATE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Checkout containing the pull request's files
    #[arg(long, default_value = ".")]
    pub workdir: PathBuf,

    /// Format of log lines written to stderr
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// OTLP collector receiving trace spans
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,
}

impl Args {
    pub fn team_id(&self) -> Result<TeamId> {
        TeamId::from_argument(&self.team)
            .ok_or_else(|| anyhow!("cannot derive a team name from '{}'", self.team))
    }

    pub fn user_login(&self) -> Result<UserLogin> {
        UserLogin::new(self.user.trim()).ok_or_else(|| anyhow!("user login must not be empty"))
    }

    pub fn github_config(&self) -> GithubConfig {
        GithubConfig::new(&self.api_url, &self.org).with_token(self.token.clone())
    }
}

/// Exit status after clap refused the command line: `0` for help and
/// version requests, `1` for anything else.
pub fn rejection_exit_code(error: &clap::Error) -> u8 {
    if error.use_stderr() {
        1
    } else {
        0
    }
}
