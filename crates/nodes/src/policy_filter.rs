//! Static policy checks on a workflow file's text.

use std::io::ErrorKind;
use std::path::Path;

use pipeline::source_checks::{check_schedule_interval, check_start_date};
use pipeline::{GateError, GatePolicy, IntervalCheck, ReferenceInstant, RepoPath};
use serde::Serialize;
use tracing::{info, instrument};

/// What the policy filter established about a file that passed it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyReport {
    /// Human-readable summary of the schedule-interval check.
    pub interval: String,
    /// The `start_date` lines inspected.
    pub start_date_lines: Vec<String>,
}

/// Reads `file` from `source_path` and applies the schedule-interval and
/// start-date rules. Any violation is fatal.
#[instrument(skip_all, fields(file = %file))]
pub async fn apply_policy_filter(
    source_path: &Path,
    file: &RepoPath,
    reference: ReferenceInstant,
    policy: &GatePolicy,
) -> Result<PolicyReport, GateError> {
    let source = tokio::fs::read_to_string(source_path)
        .await
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => GateError::SourceMissing { path: file.clone() },
            _ => GateError::SourceUnreadable {
                path: file.clone(),
                message: e.to_string(),
            },
        })?;

    let interval = match check_schedule_interval(&source, reference, policy)? {
        IntervalCheck::Absent => "not set (scheduler default)".to_string(),
        IntervalCheck::Macro(name) => name,
        IntervalCheck::Cron {
            expression,
            next_fire,
            gap,
        } => format!(
            "{expression} (next run {next_fire}, {} minutes after {reference})",
            gap.num_minutes()
        ),
    };
    info!(%interval, "Check - schedule_interval - PASSED");

    let start_date_lines = check_start_date(&source)?;
    info!(lines = ?start_date_lines, "Check - start_date - PASSED");

    Ok(PolicyReport {
        interval,
        start_date_lines,
    })
}
