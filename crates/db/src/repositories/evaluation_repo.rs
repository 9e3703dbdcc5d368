//! Repository for the `bias_fairness_evaluations` table.
//!
//! Every query is scoped by `tenant`; there is no unscoped lookup.

use sqlx::{PgConnection, PgPool};

use fairscope_core::evaluation::{EvaluationRecord, EvaluationStatus, NewEvaluation};

use crate::models::evaluation::EvaluationRow;

/// Column list for `bias_fairness_evaluations` queries.
const COLUMNS: &str = "\
    id, tenant, eval_id, model_name, dataset_name, model_task, label_behavior, \
    config_data, status_id, results, failure_reason, error_detail, \
    created_at, updated_at";

/// Provides CRUD operations for evaluation records.
pub struct EvaluationRepo;

impl EvaluationRepo {
    /// Insert a new `pending` record.
    ///
    /// A duplicate `(tenant, eval_id)` violates
    /// `uq_bias_fairness_evaluations_tenant_eval_id`.
    pub async fn create(pool: &PgPool, input: &NewEvaluation) -> Result<EvaluationRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO bias_fairness_evaluations \
                 (tenant, eval_id, model_name, dataset_name, model_task, label_behavior, \
                  config_data, status_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EvaluationRow>(&query)
            .bind(&input.tenant)
            .bind(&input.eval_id)
            .bind(&input.model_name)
            .bind(&input.dataset_name)
            .bind(&input.model_task)
            .bind(&input.label_behavior)
            .bind(&input.config)
            .bind(EvaluationStatus::Pending.id())
            .fetch_one(pool)
            .await
    }

    pub async fn find(
        pool: &PgPool,
        tenant: &str,
        eval_id: &str,
    ) -> Result<Option<EvaluationRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM bias_fairness_evaluations \
             WHERE tenant = $1 AND eval_id = $2"
        );
        sqlx::query_as::<_, EvaluationRow>(&query)
            .bind(tenant)
            .bind(eval_id)
            .fetch_optional(pool)
            .await
    }

    /// Same as [`find`](Self::find) but takes a row lock for the
    /// surrounding transaction.
    pub async fn find_for_update(
        conn: &mut PgConnection,
        tenant: &str,
        eval_id: &str,
    ) -> Result<Option<EvaluationRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM bias_fairness_evaluations \
             WHERE tenant = $1 AND eval_id = $2 \
             FOR UPDATE"
        );
        sqlx::query_as::<_, EvaluationRow>(&query)
            .bind(tenant)
            .bind(eval_id)
            .fetch_optional(conn)
            .await
    }

    /// All records of a tenant, newest first.
    pub async fn list_by_tenant(
        pool: &PgPool,
        tenant: &str,
    ) -> Result<Vec<EvaluationRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM bias_fairness_evaluations \
             WHERE tenant = $1 \
             ORDER BY created_at DESC, eval_id DESC"
        );
        sqlx::query_as::<_, EvaluationRow>(&query)
            .bind(tenant)
            .fetch_all(pool)
            .await
    }

    /// Persist the lifecycle fields of an already-checked record.
    pub async fn write_status(
        conn: &mut PgConnection,
        record: &EvaluationRecord,
    ) -> Result<EvaluationRow, sqlx::Error> {
        let query = format!(
            "UPDATE bias_fairness_evaluations \
             SET status_id = $3, results = $4, failure_reason = $5, error_detail = $6, \
                 updated_at = $7 \
             WHERE tenant = $1 AND eval_id = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EvaluationRow>(&query)
            .bind(&record.tenant)
            .bind(&record.eval_id)
            .bind(record.status.id())
            .bind(&record.results)
            .bind(record.failure_reason.map(|r| r.as_str()))
            .bind(&record.error_detail)
            .bind(record.updated_at)
            .fetch_one(conn)
            .await
    }

    /// Returns `true` if a row was deleted.
    pub async fn delete(pool: &PgPool, tenant: &str, eval_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM bias_fairness_evaluations WHERE tenant = $1 AND eval_id = $2",
        )
        .bind(tenant)
        .bind(eval_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
