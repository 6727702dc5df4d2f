//! DAG gate entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration**: positional team and user, API and logging
//!    options (see [`config::Args`]).
//! 2. **Wire observability**: `tracing-subscriber` with a text or JSON layer
//!    and an optional OpenTelemetry OTLP exporter.
//! 3. **Construct infrastructure**: a [`github::GithubClient`] and a
//!    [`runner::TokioCommandRunner`], injected into [`nodes::GateExecutor`].
//! 4. **Report**: print the final report and map the outcome to the process
//!    exit status.

mod config;
mod observability;
mod report;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use github::GithubClient;
use nodes::GateExecutor;
use runner::TokioCommandRunner;
use tracing::{error, info};

use crate::config::Args;

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(config::rejection_exit_code(&e));
        }
    };

    let telemetry = match observability::init(
        args.log_format,
        args.verbose,
        args.otlp_endpoint.as_deref(),
    ) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("failed to initialise telemetry: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let code = match run(&args).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{e:#}"), "gate could not start");
            eprintln!("{e:#}");
            1
        }
    };

    telemetry.shutdown();
    ExitCode::from(code)
}

async fn run(args: &Args) -> Result<u8> {
    let team = args.team_id()?;
    let user = args.user_login()?;

    let vcs =
        GithubClient::new(args.github_config()).context("failed to build the GitHub client")?;
    let executor = GateExecutor::new(
        Arc::new(vcs),
        Arc::new(TokioCommandRunner::new()),
        args.workdir.clone(),
    );
    info!(%team, %user, reference = %executor.reference(), "starting DAG gate");

    let result = executor.run(&team, &user).await;
    if let Err(e) = &result {
        error!(error = %e, "gate stopped");
    }

    print!("{}", report::render(&result));
    Ok(report::exit_code(&result))
}
