//! Caller-facing facade over the evaluation lifecycle.
//!
//! [`EvaluationService::submit`] does all validation synchronously; once it
//! returns a [`Submission`] the run is in the background and only visible
//! through the stores.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;

use fairscope_core::computation::ExternalComputation;
use fairscope_core::config::artifact::ArtifactLayout;
use fairscope_core::config::materialize;
use fairscope_core::error::CoreError;
use fairscope_core::evaluation::{EvaluationRecord, EvaluationStatus, NewEvaluation};
use fairscope_core::job_status::JobStatusEntry;
use fairscope_core::memory::{MemoryEvaluationStore, MemoryStatusStore};
use fairscope_core::sequencer::{AtomicJobSequencer, JobSequencer};
use fairscope_core::store::{EvaluationStore, StatusStore};
use fairscope_core::tenant::validate_tenant;
use fairscope_core::types::JobId;

use crate::dispatcher::Dispatcher;
use crate::runner::{EvaluationRunner, RunRequest};

/// Storage and id backends the service runs against.
#[derive(Clone)]
pub struct Backends {
    pub sequencer: Arc<dyn JobSequencer>,
    pub evaluations: Arc<dyn EvaluationStore>,
    pub statuses: Arc<dyn StatusStore>,
}

impl Backends {
    /// Process-local backends. Suitable for a single instance and for tests.
    pub fn in_memory(status_ttl: Duration) -> Self {
        Self {
            sequencer: Arc::new(AtomicJobSequencer::default()),
            evaluations: Arc::new(MemoryEvaluationStore::new()),
            statuses: Arc::new(MemoryStatusStore::new(status_ttl)),
        }
    }
}

/// Acknowledgement of an accepted submission.
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub job_id: JobId,
    pub eval_id: String,
    pub status: EvaluationStatus,
    pub config_path: PathBuf,
}

pub struct EvaluationService {
    backends: Backends,
    artifacts: ArtifactLayout,
    dispatcher: Dispatcher,
}

impl EvaluationService {
    pub fn new(
        backends: Backends,
        computation: Arc<dyn ExternalComputation>,
        artifacts: ArtifactLayout,
        item_limit: u32,
    ) -> Self {
        let runner = EvaluationRunner::new(
            Arc::clone(&backends.evaluations),
            Arc::clone(&backends.statuses),
            computation,
            item_limit,
        );
        Self {
            backends,
            artifacts,
            dispatcher: Dispatcher::new(Arc::new(runner)),
        }
    }

    pub fn statuses(&self) -> &Arc<dyn StatusStore> {
        &self.backends.statuses
    }

    /// Validate, persist and dispatch a new evaluation.
    ///
    /// Nothing is created (no job id, no record, no artifact) when the
    /// overrides are rejected.
    pub async fn submit(
        &self,
        tenant: &str,
        overrides: &serde_json::Value,
    ) -> Result<Submission, CoreError> {
        validate_tenant(tenant)?;
        let config = materialize(overrides)?;
        let config_json = config.to_json()?;

        let job_id = self.backends.sequencer.next_id().await?;
        let eval_id = format!("eval_{job_id}_{}", Utc::now().timestamp());

        let config_path = self.artifacts.write_config(&eval_id, &config).await?;
        let output_path = self.artifacts.results_path(&eval_id)?;

        let new = NewEvaluation {
            eval_id: eval_id.clone(),
            tenant: tenant.to_string(),
            model_name: config.model.huggingface.model_id.clone(),
            dataset_name: config.dataset.name.clone(),
            model_task: config.model.model_task.as_str().to_string(),
            label_behavior: config.model.label_behavior.as_str().to_string(),
            config: config_json,
        };

        if let Err(e) = self.backends.evaluations.create(new).await {
            if let Err(cleanup) = self.artifacts.remove(&eval_id).await {
                tracing::warn!(eval_id = %eval_id, error = %cleanup, "Failed to remove orphaned artifacts");
            }
            return Err(e);
        }

        tracing::info!(
            job_id,
            eval_id = %eval_id,
            tenant = %tenant,
            model = %config.model.huggingface.model_id,
            dataset = %config.dataset.name,
            "Evaluation submitted",
        );

        self.dispatcher.dispatch(RunRequest {
            job_id,
            eval_id: eval_id.clone(),
            tenant: tenant.to_string(),
            config_path: config_path.clone(),
            output_path,
        });

        Ok(Submission {
            job_id,
            eval_id,
            status: EvaluationStatus::Pending,
            config_path,
        })
    }

    /// Destructive poll: the entry is returned once, then gone.
    ///
    /// Jobs submitted by another tenant read as not ready and are left for
    /// their owner.
    pub async fn poll_job(
        &self,
        tenant: &str,
        job_id: JobId,
    ) -> Result<Option<JobStatusEntry>, CoreError> {
        validate_tenant(tenant)?;
        self.backends.statuses.consume(tenant, job_id).await
    }

    pub async fn peek_job(
        &self,
        tenant: &str,
        job_id: JobId,
    ) -> Result<Option<JobStatusEntry>, CoreError> {
        validate_tenant(tenant)?;
        self.backends.statuses.peek(tenant, job_id).await
    }

    pub async fn get_evaluation(
        &self,
        tenant: &str,
        eval_id: &str,
    ) -> Result<EvaluationRecord, CoreError> {
        validate_tenant(tenant)?;
        self.backends
            .evaluations
            .get(tenant, eval_id)
            .await?
            .ok_or_else(|| CoreError::evaluation_not_found(eval_id))
    }

    pub async fn list_evaluations(&self, tenant: &str) -> Result<Vec<EvaluationRecord>, CoreError> {
        validate_tenant(tenant)?;
        self.backends.evaluations.list(tenant).await
    }

    /// Remove a record. An in-flight run is not stopped and its artifacts
    /// stay on disk.
    pub async fn delete_evaluation(&self, tenant: &str, eval_id: &str) -> Result<bool, CoreError> {
        validate_tenant(tenant)?;
        let deleted = self.backends.evaluations.delete(tenant, eval_id).await?;
        if deleted {
            tracing::info!(eval_id = %eval_id, tenant = %tenant, "Evaluation deleted");
        }
        Ok(deleted)
    }

    pub fn in_flight(&self) -> usize {
        self.dispatcher.in_flight()
    }

    /// Wait (bounded) for in-flight runs. See [`Dispatcher::shutdown`].
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.dispatcher.shutdown(timeout).await
    }
}
