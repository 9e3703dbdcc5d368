//! Storage capability traits.
//!
//! [`StatusStore`] is the fast, expiring key-value store polled by callers;
//! [`EvaluationStore`] holds the durable tenant-scoped records. Postgres
//! implementations live in `fairscope-db`, in-memory ones in
//! [`crate::memory`].

use async_trait::async_trait;

use crate::error::CoreError;
use crate::evaluation::{EvaluationRecord, NewEvaluation, StatusUpdate};
use crate::job_status::JobStatusEntry;
use crate::types::JobId;

/// Transient job status store with per-entry expiry.
///
/// Each entry belongs to the tenant that submitted the job. Reads by any
/// other tenant see nothing and leave the entry untouched.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Write `entry` for `job_id` owned by `tenant`, replacing any existing entry.
    async fn set(&self, job_id: JobId, tenant: &str, entry: &JobStatusEntry)
        -> Result<(), CoreError>;

    /// Non-destructive read.
    async fn peek(&self, tenant: &str, job_id: JobId)
        -> Result<Option<JobStatusEntry>, CoreError>;

    /// Read and delete in one atomic step.
    ///
    /// At most one caller ever receives a given entry. `None` covers "never
    /// written", "already consumed", "expired" and "owned by another tenant"
    /// alike.
    async fn consume(&self, tenant: &str, job_id: JobId)
        -> Result<Option<JobStatusEntry>, CoreError>;

    /// Drop expired entries, returning how many were removed.
    async fn purge_expired(&self) -> Result<u64, CoreError>;
}

/// Durable, tenant-scoped evaluation records.
///
/// Every read and write takes the tenant; a record owned by another tenant
/// behaves exactly as if it did not exist.
#[async_trait]
pub trait EvaluationStore: Send + Sync {
    /// Insert a new `pending` record. [`CoreError::Conflict`] if the id exists.
    async fn create(&self, new: NewEvaluation) -> Result<EvaluationRecord, CoreError>;

    async fn get(&self, tenant: &str, eval_id: &str)
        -> Result<Option<EvaluationRecord>, CoreError>;

    /// All records of `tenant`, newest first.
    async fn list(&self, tenant: &str) -> Result<Vec<EvaluationRecord>, CoreError>;

    /// Apply one lifecycle transition.
    ///
    /// Same-status writes are no-ops returning the stored record. Unknown ids
    /// are [`CoreError::NotFound`]; illegal transitions [`CoreError::Conflict`].
    async fn update_status(
        &self,
        tenant: &str,
        eval_id: &str,
        update: StatusUpdate,
    ) -> Result<EvaluationRecord, CoreError>;

    /// Remove a record. `false` when nothing matched.
    async fn delete(&self, tenant: &str, eval_id: &str) -> Result<bool, CoreError>;
}
