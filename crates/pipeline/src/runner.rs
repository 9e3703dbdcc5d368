//! Drives one evaluation from `pending` to a terminal state.
//!
//! Lifecycle:
//! 1. Mark the record `running`.
//! 2. Run the external computation.
//! 3. Record the outcome (`completed` with parsed results, or `failed` with a
//!    reason) and publish a matching status entry for pollers.
//!
//! Any error along the way becomes a best-effort `internal_error` failure;
//! a record that already reached a terminal state keeps it.
//! [`EvaluationRunner::run`] itself never fails.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fairscope_core::computation::{ComputationRequest, ExternalComputation};
use fairscope_core::error::CoreError;
use fairscope_core::evaluation::{EvaluationRecord, EvaluationStatus, FailureReason, StatusUpdate};
use fairscope_core::job_status::JobStatusEntry;
use fairscope_core::store::{EvaluationStore, StatusStore};
use fairscope_core::types::JobId;

/// Everything the runner needs to know about one accepted submission.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub job_id: JobId,
    pub eval_id: String,
    pub tenant: String,
    pub config_path: PathBuf,
    pub output_path: PathBuf,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Failed(FailureReason),
}

pub struct EvaluationRunner {
    evaluations: Arc<dyn EvaluationStore>,
    statuses: Arc<dyn StatusStore>,
    computation: Arc<dyn ExternalComputation>,
    item_limit: u32,
}

impl EvaluationRunner {
    pub fn new(
        evaluations: Arc<dyn EvaluationStore>,
        statuses: Arc<dyn StatusStore>,
        computation: Arc<dyn ExternalComputation>,
        item_limit: u32,
    ) -> Self {
        Self {
            evaluations,
            statuses,
            computation,
            item_limit,
        }
    }

    /// Run the evaluation to a terminal state.
    pub async fn run(&self, request: &RunRequest) -> RunOutcome {
        match self.execute(request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    job_id = request.job_id,
                    eval_id = %request.eval_id,
                    error = %e,
                    "Evaluation orchestration failed",
                );
                self.record_failure(request, &e.to_string()).await
            }
        }
    }

    async fn execute(&self, request: &RunRequest) -> Result<RunOutcome, CoreError> {
        self.evaluations
            .update_status(&request.tenant, &request.eval_id, StatusUpdate::running())
            .await?;
        tracing::info!(job_id = request.job_id, eval_id = %request.eval_id, "Evaluation running");

        let outcome = self
            .computation
            .run(&ComputationRequest {
                config_path: request.config_path.clone(),
                output_path: request.output_path.clone(),
                limit: self.item_limit,
            })
            .await;

        if !outcome.succeeded() {
            let detail = outcome.failure_detail();
            tracing::warn!(
                job_id = request.job_id,
                eval_id = %request.eval_id,
                exit_code = ?outcome.exit_code,
                "External computation failed",
            );
            self.finish_failed(request, FailureReason::ProcessError, &detail)
                .await?;
            return Ok(RunOutcome::Failed(FailureReason::ProcessError));
        }

        let Some(artifact) = outcome.artifact else {
            let detail = format!(
                "Computation exited successfully but results file not generated at {}",
                request.output_path.display()
            );
            tracing::warn!(job_id = request.job_id, eval_id = %request.eval_id, "{detail}");
            self.finish_failed(request, FailureReason::MissingResults, &detail)
                .await?;
            return Ok(RunOutcome::Failed(FailureReason::MissingResults));
        };

        let results = read_results(&artifact).await?;
        self.evaluations
            .update_status(
                &request.tenant,
                &request.eval_id,
                StatusUpdate::completed(results.clone()),
            )
            .await?;
        self.statuses
            .set(
                request.job_id,
                &request.tenant,
                &JobStatusEntry::completed(request.eval_id.clone(), results),
            )
            .await?;

        tracing::info!(job_id = request.job_id, eval_id = %request.eval_id, "Evaluation completed");
        Ok(RunOutcome::Completed)
    }

    /// Record a classified failure. Errors propagate to the internal-error path.
    async fn finish_failed(
        &self,
        request: &RunRequest,
        reason: FailureReason,
        detail: &str,
    ) -> Result<(), CoreError> {
        self.evaluations
            .update_status(
                &request.tenant,
                &request.eval_id,
                StatusUpdate::failed(reason, detail),
            )
            .await?;
        self.statuses
            .set(
                request.job_id,
                &request.tenant,
                &JobStatusEntry::failed(request.eval_id.clone(), reason, detail),
            )
            .await
    }

    /// Best-effort `internal_error` recording. Secondary errors are logged
    /// and dropped.
    ///
    /// A record that already reached a terminal state keeps it, and the
    /// published status entry mirrors whatever the record ends up holding.
    async fn record_failure(&self, request: &RunRequest, detail: &str) -> RunOutcome {
        let reason = FailureReason::InternalError;
        let entry = match self.fail_record(request, detail).await {
            Ok(record) => JobStatusEntry::for_record(&record),
            Err(e) => {
                tracing::error!(
                    job_id = request.job_id,
                    eval_id = %request.eval_id,
                    error = %e,
                    "Failed to mark evaluation as failed",
                );
                None
            }
        }
        .unwrap_or_else(|| JobStatusEntry::failed(request.eval_id.clone(), reason, detail));

        let outcome = match entry.reason {
            None => RunOutcome::Completed,
            Some(reason) => RunOutcome::Failed(reason),
        };

        if let Err(e) = self
            .statuses
            .set(request.job_id, &request.tenant, &entry)
            .await
        {
            tracing::error!(
                job_id = request.job_id,
                eval_id = %request.eval_id,
                error = %e,
                "Failed to publish job status",
            );
        }
        outcome
    }

    /// Drive the record to `failed`/`internal_error` unless it is already
    /// terminal. Returns the record as stored afterwards.
    async fn fail_record(
        &self,
        request: &RunRequest,
        detail: &str,
    ) -> Result<EvaluationRecord, CoreError> {
        let current = self
            .evaluations
            .get(&request.tenant, &request.eval_id)
            .await?
            .ok_or_else(|| CoreError::evaluation_not_found(&request.eval_id))?;

        match current.status {
            EvaluationStatus::Completed | EvaluationStatus::Failed => return Ok(current),
            // pending -> failed is not an edge.
            EvaluationStatus::Pending => {
                self.evaluations
                    .update_status(&request.tenant, &request.eval_id, StatusUpdate::running())
                    .await?;
            }
            EvaluationStatus::Running => {}
        }

        self.evaluations
            .update_status(
                &request.tenant,
                &request.eval_id,
                StatusUpdate::failed(FailureReason::InternalError, detail),
            )
            .await
    }
}

async fn read_results(path: &Path) -> Result<serde_json::Value, CoreError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        CoreError::Internal(format!("Failed to read results {}: {e}", path.display()))
    })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        CoreError::Internal(format!("Results file {} is not valid JSON: {e}", path.display()))
    })
}
