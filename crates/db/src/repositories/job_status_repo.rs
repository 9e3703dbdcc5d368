//! Repository for the `job_statuses` table.
//!
//! Rows whose `expires_at` has passed are never returned; they linger until
//! [`JobStatusRepo::purge_expired`] runs.

use std::time::Duration;

use sqlx::PgPool;

use fairscope_core::types::JobId;

use crate::models::job_status::JobStatusRow;

const COLUMNS: &str = "job_id, tenant, payload, expires_at";

pub struct JobStatusRepo;

impl JobStatusRepo {
    /// Insert or overwrite the entry for `job_id`, resetting its expiry.
    pub async fn upsert(
        pool: &PgPool,
        job_id: JobId,
        tenant: &str,
        payload: &serde_json::Value,
        ttl: Duration,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO job_statuses (job_id, tenant, payload, expires_at) \
             VALUES ($1, $2, $3, NOW() + make_interval(secs => $4)) \
             ON CONFLICT (job_id) DO UPDATE \
             SET tenant = EXCLUDED.tenant, payload = EXCLUDED.payload, \
                 expires_at = EXCLUDED.expires_at",
        )
        .bind(job_id)
        .bind(tenant)
        .bind(payload)
        .bind(ttl.as_secs_f64())
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn find_live(
        pool: &PgPool,
        tenant: &str,
        job_id: JobId,
    ) -> Result<Option<JobStatusRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM job_statuses \
             WHERE job_id = $1 AND tenant = $2 AND expires_at > NOW()"
        );
        sqlx::query_as::<_, JobStatusRow>(&query)
            .bind(job_id)
            .bind(tenant)
            .fetch_optional(pool)
            .await
    }

    /// Delete and return a live entry in a single statement.
    ///
    /// Concurrent callers race on the row; exactly one gets it back. Rows
    /// owned by another tenant are left in place.
    pub async fn take(
        pool: &PgPool,
        tenant: &str,
        job_id: JobId,
    ) -> Result<Option<JobStatusRow>, sqlx::Error> {
        let query = format!(
            "DELETE FROM job_statuses \
             WHERE job_id = $1 AND tenant = $2 AND expires_at > NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, JobStatusRow>(&query)
            .bind(job_id)
            .bind(tenant)
            .fetch_optional(pool)
            .await
    }

    /// Delete expired entries. Returns the number of rows removed.
    pub async fn purge_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM job_statuses WHERE expires_at <= NOW()")
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
