//! The executor that drives a gate run from pull request to verdict.

use std::path::PathBuf;
use std::sync::Arc;

use pipeline::{
    CommandRunner, GateError, GateOutcome, GatePolicy, GateRunId, ReferenceInstant, RepoPath,
    RunReport, TeamId, ToolCommands, UserLogin, ValidationResult, VersionControl,
};
use tracing::{info, info_span, warn, Instrument};

use crate::dry_run::DryRunVerifier;
use crate::{enumerator, policy_filter, resolver, syntax};

/// Sequences every stage of the gate.
///
/// Stages run strictly one after another: each external call completes
/// before the next is issued. The first fatal condition ends the run.
pub struct GateExecutor {
    vcs: Arc<dyn VersionControl>,
    runner: Arc<dyn CommandRunner>,
    commands: ToolCommands,
    policy: GatePolicy,
    reference: ReferenceInstant,
}

impl GateExecutor {
    /// Creates an executor validating files of the checkout at `workdir`,
    /// anchored to the start of the current day.
    pub fn new(
        vcs: Arc<dyn VersionControl>,
        runner: Arc<dyn CommandRunner>,
        workdir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            vcs,
            runner,
            commands: ToolCommands::new(workdir),
            policy: GatePolicy::default(),
            reference: ReferenceInstant::start_of_today(),
        }
    }

    /// Anchors schedule checks and dry-runs to `reference` instead of today.
    pub fn with_reference(mut self, reference: ReferenceInstant) -> Self {
        self.reference = reference;
        self
    }

    pub fn reference(&self) -> ReferenceInstant {
        self.reference
    }

    /// Runs the gate for the pull request `user` opened against `team`.
    pub async fn run(&self, team: &TeamId, user: &UserLogin) -> Result<GateOutcome, GateError> {
        let run_id = GateRunId::new_random();
        let span = info_span!("gate_run", %run_id, %team, %user);
        self.run_inner(run_id, team, user).instrument(span).await
    }

    async fn run_inner(
        &self,
        run_id: GateRunId,
        team: &TeamId,
        user: &UserLogin,
    ) -> Result<GateOutcome, GateError> {
        let vcs = self.vcs.as_ref();

        let pull_request = resolver::resolve_pull_request(vcs, team, user).await?;
        resolver::check_squash(vcs, team, &pull_request).await?;
        let files = resolver::discover_workflow_files(vcs, team, &pull_request, &self.policy).await?;
        if files.is_empty() {
            return Ok(GateOutcome::NothingToValidate { pull_request });
        }

        let mut report = RunReport {
            run_id,
            pull_request,
            files: Vec::with_capacity(files.len()),
            skipped: Vec::new(),
        };

        for file in files {
            let span = info_span!("validate_file", file = %file);
            match self.validate_file(&file).instrument(span).await {
                Ok(result) => report.files.push(result),
                Err(error)
                    if error.is_source_missing() && self.policy.may_skip_missing_source(team) =>
                {
                    warn!(file = %file, %team, "file not found; skipping for allow-listed team");
                    report.skipped.push(file);
                }
                Err(error) => return Err(error),
            }
        }

        info!(verdict = %report.verdict(), files = report.files.len(), "gate finished");
        Ok(GateOutcome::Completed(report))
    }

    /// Runs the policy filter, enumeration, syntax and dry-run stages for
    /// one file and returns everything recorded about it.
    pub async fn validate_file(&self, file: &RepoPath) -> Result<ValidationResult, GateError> {
        let runner = self.runner.as_ref();
        info!("{:=^120}", format!(" TESTING - {file} "));

        policy_filter::apply_policy_filter(
            &self.commands.source_path(file),
            file,
            self.reference,
            &self.policy,
        )
        .await?;

        let workflows = enumerator::list_workflows(runner, &self.commands, &self.policy, file).await?;

        let mut result = ValidationResult::new(file.clone());
        for lint in syntax::verify_syntax(runner, &self.commands, file).await {
            result.record_syntax(lint.kind, lint.verdict);
        }

        let verifier = DryRunVerifier::new(runner, &self.commands, &self.policy, self.reference);
        for workflow in workflows {
            let tasks =
                enumerator::list_tasks(runner, &self.commands, &self.policy, file, &workflow).await?;
            let dry_run = verifier.verify_workflow(file, &workflow, &tasks).await;
            result.record_workflow(workflow, dry_run.verdict());
        }

        Ok(result)
    }
}
