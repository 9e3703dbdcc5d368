//! Postgres implementations of the core storage traits.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use fairscope_core::error::CoreError;
use fairscope_core::evaluation::{apply_update, EvaluationRecord, NewEvaluation, StatusUpdate};
use fairscope_core::job_status::JobStatusEntry;
use fairscope_core::sequencer::JobSequencer;
use fairscope_core::store::{EvaluationStore, StatusStore};
use fairscope_core::types::JobId;

use crate::repositories::{EvaluationRepo, JobSequenceRepo, JobStatusRepo};

/// Map a sqlx error onto the domain taxonomy.
///
/// Unique violations become [`CoreError::Conflict`]; decode problems are
/// [`CoreError::Internal`]; everything else (pool exhaustion, I/O, dropped
/// connections) is [`CoreError::Unavailable`].
pub fn map_db_error(err: sqlx::Error) -> CoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            let constraint = db_err.constraint().unwrap_or("unique constraint");
            CoreError::Conflict(format!("Duplicate value violates {constraint}"))
        }
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::TypeNotFound { .. } => CoreError::Internal(err.to_string()),
        _ => CoreError::Unavailable(format!("Database error: {err}")),
    }
}

// ---------------------------------------------------------------------------
// Evaluation records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PgEvaluationStore {
    pool: PgPool,
}

impl PgEvaluationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EvaluationStore for PgEvaluationStore {
    async fn create(&self, new: NewEvaluation) -> Result<EvaluationRecord, CoreError> {
        EvaluationRepo::create(&self.pool, &new)
            .await
            .map_err(map_db_error)?
            .into_record()
    }

    async fn get(
        &self,
        tenant: &str,
        eval_id: &str,
    ) -> Result<Option<EvaluationRecord>, CoreError> {
        EvaluationRepo::find(&self.pool, tenant, eval_id)
            .await
            .map_err(map_db_error)?
            .map(|row| row.into_record())
            .transpose()
    }

    async fn list(&self, tenant: &str) -> Result<Vec<EvaluationRecord>, CoreError> {
        EvaluationRepo::list_by_tenant(&self.pool, tenant)
            .await
            .map_err(map_db_error)?
            .into_iter()
            .map(|row| row.into_record())
            .collect()
    }

    async fn update_status(
        &self,
        tenant: &str,
        eval_id: &str,
        update: StatusUpdate,
    ) -> Result<EvaluationRecord, CoreError> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let mut record = EvaluationRepo::find_for_update(&mut tx, tenant, eval_id)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| CoreError::evaluation_not_found(eval_id))?
            .into_record()?;

        if !apply_update(&mut record, &update, Utc::now())? {
            // Same-status write: release the lock without touching the row.
            tx.rollback().await.map_err(map_db_error)?;
            return Ok(record);
        }

        let row = EvaluationRepo::write_status(&mut tx, &record)
            .await
            .map_err(map_db_error)?;
        tx.commit().await.map_err(map_db_error)?;
        row.into_record()
    }

    async fn delete(&self, tenant: &str, eval_id: &str) -> Result<bool, CoreError> {
        EvaluationRepo::delete(&self.pool, tenant, eval_id)
            .await
            .map_err(map_db_error)
    }
}

// ---------------------------------------------------------------------------
// Transient job statuses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PgStatusStore {
    pool: PgPool,
    ttl: Duration,
}

impl PgStatusStore {
    pub fn new(pool: PgPool, ttl: Duration) -> Self {
        Self { pool, ttl }
    }
}

#[async_trait]
impl StatusStore for PgStatusStore {
    async fn set(
        &self,
        job_id: JobId,
        tenant: &str,
        entry: &JobStatusEntry,
    ) -> Result<(), CoreError> {
        let payload = serde_json::to_value(entry)
            .map_err(|e| CoreError::Internal(format!("Failed to encode status entry: {e}")))?;
        JobStatusRepo::upsert(&self.pool, job_id, tenant, &payload, self.ttl)
            .await
            .map_err(map_db_error)
    }

    async fn peek(
        &self,
        tenant: &str,
        job_id: JobId,
    ) -> Result<Option<JobStatusEntry>, CoreError> {
        JobStatusRepo::find_live(&self.pool, tenant, job_id)
            .await
            .map_err(map_db_error)?
            .map(|row| row.into_entry())
            .transpose()
    }

    async fn consume(
        &self,
        tenant: &str,
        job_id: JobId,
    ) -> Result<Option<JobStatusEntry>, CoreError> {
        JobStatusRepo::take(&self.pool, tenant, job_id)
            .await
            .map_err(map_db_error)?
            .map(|row| row.into_entry())
            .transpose()
    }

    async fn purge_expired(&self) -> Result<u64, CoreError> {
        JobStatusRepo::purge_expired(&self.pool)
            .await
            .map_err(map_db_error)
    }
}

// ---------------------------------------------------------------------------
// Job id sequence
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PgJobSequencer {
    pool: PgPool,
}

impl PgJobSequencer {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobSequencer for PgJobSequencer {
    async fn next_id(&self) -> Result<JobId, CoreError> {
        JobSequenceRepo::next_id(&self.pool)
            .await
            .map_err(map_db_error)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn pool_timeout_is_unavailable() {
        let err = map_db_error(sqlx::Error::PoolTimedOut);
        assert_matches!(err, CoreError::Unavailable(_));
        assert!(err.is_retryable());
    }

    #[test]
    fn decode_failure_is_internal() {
        let err = map_db_error(sqlx::Error::ColumnNotFound("payload".into()));
        assert_matches!(err, CoreError::Internal(_));
    }
}
