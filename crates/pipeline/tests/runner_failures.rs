//! Runner behaviour when the stores themselves fail mid-run.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use fairscope_core::computation::{ComputationOutcome, ComputationRequest, ExternalComputation};
use fairscope_core::error::CoreError;
use fairscope_core::evaluation::{
    EvaluationRecord, EvaluationStatus, FailureReason, NewEvaluation, StatusUpdate,
};
use fairscope_core::job_status::{JobState, JobStatusEntry};
use fairscope_core::memory::{MemoryEvaluationStore, MemoryStatusStore};
use fairscope_core::store::{EvaluationStore, StatusStore};
use fairscope_core::types::JobId;
use fairscope_pipeline::{EvaluationRunner, RunOutcome, RunRequest};

const TENANT: &str = "acme";
const EVAL_ID: &str = "eval_1_1700000000";

// ---------------------------------------------------------------------------
// Doubles
// ---------------------------------------------------------------------------

fn unavailable() -> CoreError {
    CoreError::Unavailable("connection reset".into())
}

/// Status store whose first `failures` writes fail.
struct FlakyStatusStore {
    inner: MemoryStatusStore,
    failures: AtomicUsize,
}

impl FlakyStatusStore {
    fn new(failures: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryStatusStore::new(Duration::from_secs(60)),
            failures: AtomicUsize::new(failures),
        })
    }
}

#[async_trait]
impl StatusStore for FlakyStatusStore {
    async fn set(
        &self,
        job_id: JobId,
        tenant: &str,
        entry: &JobStatusEntry,
    ) -> Result<(), CoreError> {
        let remaining = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if remaining.is_ok() {
            return Err(unavailable());
        }
        self.inner.set(job_id, tenant, entry).await
    }

    async fn peek(&self, tenant: &str, job_id: JobId)
        -> Result<Option<JobStatusEntry>, CoreError> {
        self.inner.peek(tenant, job_id).await
    }

    async fn consume(&self, tenant: &str, job_id: JobId)
        -> Result<Option<JobStatusEntry>, CoreError> {
        self.inner.consume(tenant, job_id).await
    }

    async fn purge_expired(&self) -> Result<u64, CoreError> {
        self.inner.purge_expired().await
    }
}

/// Evaluation store that fails the first `failures` updates targeting
/// `target`, and logs every status it actually wrote.
struct FaultyEvaluationStore {
    inner: MemoryEvaluationStore,
    target: EvaluationStatus,
    failures: AtomicUsize,
    written: Mutex<Vec<EvaluationStatus>>,
}

impl FaultyEvaluationStore {
    fn new(target: EvaluationStatus, failures: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryEvaluationStore::new(),
            target,
            failures: AtomicUsize::new(failures),
            written: Mutex::new(Vec::new()),
        })
    }

    fn written(&self) -> Vec<EvaluationStatus> {
        self.written.lock().unwrap().clone()
    }
}

#[async_trait]
impl EvaluationStore for FaultyEvaluationStore {
    async fn create(&self, new: NewEvaluation) -> Result<EvaluationRecord, CoreError> {
        self.inner.create(new).await
    }

    async fn get(&self, tenant: &str, eval_id: &str)
        -> Result<Option<EvaluationRecord>, CoreError> {
        self.inner.get(tenant, eval_id).await
    }

    async fn list(&self, tenant: &str) -> Result<Vec<EvaluationRecord>, CoreError> {
        self.inner.list(tenant).await
    }

    async fn update_status(
        &self,
        tenant: &str,
        eval_id: &str,
        update: StatusUpdate,
    ) -> Result<EvaluationRecord, CoreError> {
        if update.status == self.target
            && self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        {
            return Err(unavailable());
        }
        let status = update.status;
        let record = self.inner.update_status(tenant, eval_id, update).await?;
        self.written.lock().unwrap().push(status);
        Ok(record)
    }

    async fn delete(&self, tenant: &str, eval_id: &str) -> Result<bool, CoreError> {
        self.inner.delete(tenant, eval_id).await
    }
}

/// Exits with `exit_code`, writing `results` to the output path first when given.
struct ScriptedComputation {
    exit_code: i32,
    results: Option<serde_json::Value>,
}

#[async_trait]
impl ExternalComputation for ScriptedComputation {
    async fn run(&self, request: &ComputationRequest) -> ComputationOutcome {
        let artifact = match &self.results {
            Some(value) => {
                tokio::fs::write(&request.output_path, value.to_string())
                    .await
                    .unwrap();
                Some(request.output_path.clone())
            }
            None => None,
        };
        ComputationOutcome {
            exit_code: Some(self.exit_code),
            stderr: if self.exit_code == 0 { String::new() } else { "OOM".into() },
            artifact,
        }
    }
}

fn succeeding() -> Arc<ScriptedComputation> {
    Arc::new(ScriptedComputation {
        exit_code: 0,
        results: Some(json!({"performance": {"accuracy": 0.82}})),
    })
}

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

struct Fixture {
    runner: EvaluationRunner,
    request: RunRequest,
    _dir: tempfile::TempDir,
}

async fn fixture(
    evaluations: Arc<dyn EvaluationStore>,
    statuses: Arc<dyn StatusStore>,
    computation: Arc<dyn ExternalComputation>,
) -> Fixture {
    evaluations
        .create(NewEvaluation {
            eval_id: EVAL_ID.into(),
            tenant: TENANT.into(),
            model_name: "TinyLlama/TinyLlama-1.1B-Chat-v1.0".into(),
            dataset_name: "adult-census-income".into(),
            model_task: "binary_classification".into(),
            label_behavior: "binary".into(),
            config: json!({}),
        })
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    Fixture {
        runner: EvaluationRunner::new(evaluations, statuses, computation, 50),
        request: RunRequest {
            job_id: 1,
            eval_id: EVAL_ID.into(),
            tenant: TENANT.into(),
            config_path: dir.path().join("config.yaml"),
            output_path: dir.path().join("clean_results.json"),
        },
        _dir: dir,
    }
}

async fn record(store: &dyn EvaluationStore) -> EvaluationRecord {
    store.get(TENANT, EVAL_ID).await.unwrap().unwrap()
}

// ---------------------------------------------------------------------------
// Status publish failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_write_failure_after_completion_republishes_completed_entry() {
    let evaluations = Arc::new(MemoryEvaluationStore::new());
    let statuses = FlakyStatusStore::new(1);
    let f = fixture(evaluations.clone(), statuses.clone(), succeeding()).await;

    let outcome = f.runner.run(&f.request).await;

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(record(evaluations.as_ref()).await.status, EvaluationStatus::Completed);
    let entry = statuses.consume(TENANT, 1).await.unwrap().unwrap();
    assert_eq!(entry.status, JobState::Completed);
    assert_eq!(entry.results, Some(json!({"performance": {"accuracy": 0.82}})));
}

#[tokio::test]
async fn status_write_failure_after_process_error_keeps_original_reason() {
    let evaluations = Arc::new(MemoryEvaluationStore::new());
    let statuses = FlakyStatusStore::new(1);
    let computation = Arc::new(ScriptedComputation {
        exit_code: 1,
        results: None,
    });
    let f = fixture(evaluations.clone(), statuses.clone(), computation).await;

    let outcome = f.runner.run(&f.request).await;

    assert_eq!(outcome, RunOutcome::Failed(FailureReason::ProcessError));
    let stored = record(evaluations.as_ref()).await;
    assert_eq!(stored.failure_reason, Some(FailureReason::ProcessError));
    let entry = statuses.consume(TENANT, 1).await.unwrap().unwrap();
    assert_eq!(entry.reason, Some(FailureReason::ProcessError));
    assert_eq!(entry.error.as_deref(), Some("OOM"));
}

// ---------------------------------------------------------------------------
// Evaluation store failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failure_before_running_promotes_pending_then_fails() {
    let evaluations = FaultyEvaluationStore::new(EvaluationStatus::Running, 1);
    let statuses = Arc::new(MemoryStatusStore::new(Duration::from_secs(60)));
    let f = fixture(evaluations.clone(), statuses.clone(), succeeding()).await;

    let outcome = f.runner.run(&f.request).await;

    assert_eq!(outcome, RunOutcome::Failed(FailureReason::InternalError));
    assert_eq!(
        evaluations.written(),
        vec![EvaluationStatus::Running, EvaluationStatus::Failed]
    );
    let stored = record(evaluations.as_ref()).await;
    assert_eq!(stored.status, EvaluationStatus::Failed);
    assert_eq!(stored.failure_reason, Some(FailureReason::InternalError));
    assert!(stored.error_detail.unwrap().contains("connection reset"));

    let entry = statuses.consume(TENANT, 1).await.unwrap().unwrap();
    assert_eq!(entry.reason, Some(FailureReason::InternalError));
    assert!(!f.request.output_path.exists(), "computation must not run");
}

#[tokio::test]
async fn secondary_failure_while_recording_is_swallowed() {
    // Completing fails, and so does every attempt to mark the record failed.
    let evaluations = Arc::new(CompositeFaults {
        inner: FaultyEvaluationStore::new(EvaluationStatus::Completed, 1),
        failed_writes: AtomicUsize::new(usize::MAX),
    });
    let statuses = Arc::new(MemoryStatusStore::new(Duration::from_secs(60)));
    let f = fixture(evaluations.clone(), statuses.clone(), succeeding()).await;

    let outcome = f.runner.run(&f.request).await;

    assert_eq!(outcome, RunOutcome::Failed(FailureReason::InternalError));
    // The record is stranded in `running`; pollers still learn the run failed.
    assert_eq!(record(evaluations.as_ref()).await.status, EvaluationStatus::Running);
    let entry = statuses.consume(TENANT, 1).await.unwrap().unwrap();
    assert_eq!(entry.status, JobState::Failed);
    assert_eq!(entry.reason, Some(FailureReason::InternalError));
}

#[tokio::test]
async fn run_terminates_when_every_store_is_down() {
    let evaluations = FaultyEvaluationStore::new(EvaluationStatus::Running, usize::MAX);
    let statuses = FlakyStatusStore::new(usize::MAX);
    let f = fixture(evaluations.clone(), statuses.clone(), succeeding()).await;

    let outcome = tokio::time::timeout(Duration::from_secs(5), f.runner.run(&f.request))
        .await
        .expect("run must finish");

    assert_eq!(outcome, RunOutcome::Failed(FailureReason::InternalError));
    assert!(evaluations.written().is_empty());
    assert_eq!(statuses.peek(TENANT, 1).await.unwrap(), None);
}

/// [`FaultyEvaluationStore`] that also fails `failed` writes.
struct CompositeFaults {
    inner: Arc<FaultyEvaluationStore>,
    failed_writes: AtomicUsize,
}

#[async_trait]
impl EvaluationStore for CompositeFaults {
    async fn create(&self, new: NewEvaluation) -> Result<EvaluationRecord, CoreError> {
        self.inner.create(new).await
    }

    async fn get(&self, tenant: &str, eval_id: &str)
        -> Result<Option<EvaluationRecord>, CoreError> {
        self.inner.get(tenant, eval_id).await
    }

    async fn list(&self, tenant: &str) -> Result<Vec<EvaluationRecord>, CoreError> {
        self.inner.list(tenant).await
    }

    async fn update_status(
        &self,
        tenant: &str,
        eval_id: &str,
        update: StatusUpdate,
    ) -> Result<EvaluationRecord, CoreError> {
        if update.status == EvaluationStatus::Failed
            && self
                .failed_writes
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        {
            return Err(unavailable());
        }
        self.inner.update_status(tenant, eval_id, update).await
    }

    async fn delete(&self, tenant: &str, eval_id: &str) -> Result<bool, CoreError> {
        self.inner.delete(tenant, eval_id).await
    }
}
