//! Access to the `evaluation_job_id_seq` sequence.

use sqlx::PgPool;

use fairscope_core::types::JobId;

pub struct JobSequenceRepo;

impl JobSequenceRepo {
    /// Draw the next job id. Never returns the same value twice, across
    /// connections and processes.
    pub async fn next_id(pool: &PgPool) -> Result<JobId, sqlx::Error> {
        let (id,): (JobId,) = sqlx::query_as("SELECT nextval('evaluation_job_id_seq')")
            .fetch_one(pool)
            .await?;
        Ok(id)
    }
}
