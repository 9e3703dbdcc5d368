//! Row model for the `bias_fairness_evaluations` table.

use serde::Serialize;
use sqlx::FromRow;

use fairscope_core::error::CoreError;
use fairscope_core::evaluation::{EvaluationRecord, EvaluationStatus, FailureReason, StatusId};
use fairscope_core::types::{DbId, Timestamp};

/// A row from the `bias_fairness_evaluations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EvaluationRow {
    pub id: DbId,
    pub tenant: String,
    pub eval_id: String,
    pub model_name: String,
    pub dataset_name: String,
    pub model_task: String,
    pub label_behavior: String,
    pub config_data: serde_json::Value,
    pub status_id: StatusId,
    pub results: Option<serde_json::Value>,
    pub failure_reason: Option<String>,
    pub error_detail: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl EvaluationRow {
    /// Convert to the domain record, resolving lookup ids and reason codes.
    pub fn into_record(self) -> Result<EvaluationRecord, CoreError> {
        let status = EvaluationStatus::from_id(self.status_id).ok_or_else(|| {
            CoreError::Internal(format!(
                "Evaluation {} has unknown status_id {}",
                self.eval_id, self.status_id
            ))
        })?;
        let failure_reason = self
            .failure_reason
            .as_deref()
            .map(str::parse::<FailureReason>)
            .transpose()
            .map_err(|e| CoreError::Internal(e.to_string()))?;

        Ok(EvaluationRecord {
            eval_id: self.eval_id,
            tenant: self.tenant,
            model_name: self.model_name,
            dataset_name: self.dataset_name,
            model_task: self.model_task,
            label_behavior: self.label_behavior,
            config: self.config_data,
            status,
            results: self.results,
            failure_reason,
            error_detail: self.error_detail,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
