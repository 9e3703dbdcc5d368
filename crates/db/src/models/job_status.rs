//! Row model for the `job_statuses` table.

use sqlx::FromRow;

use fairscope_core::error::CoreError;
use fairscope_core::job_status::JobStatusEntry;
use fairscope_core::types::{JobId, Timestamp};

/// A row from the `job_statuses` table.
#[derive(Debug, Clone, FromRow)]
pub struct JobStatusRow {
    pub job_id: JobId,
    pub tenant: String,
    pub payload: serde_json::Value,
    pub expires_at: Timestamp,
}

impl JobStatusRow {
    pub fn into_entry(self) -> Result<JobStatusEntry, CoreError> {
        serde_json::from_value(self.payload).map_err(|e| {
            CoreError::Internal(format!(
                "Malformed status payload for job {}: {e}",
                self.job_id
            ))
        })
    }
}
