//! Payloads written to the transient status store, keyed by job id.
//!
//! Only the runner writes entries, and only for terminal outcomes. A poller
//! that finds nothing treats the job as not ready yet.

use serde::{Deserialize, Serialize};

use crate::evaluation::{EvaluationRecord, EvaluationStatus, FailureReason};

/// Job state as reported to pollers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Completed,
    Failed,
}

/// Latest known status of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusEntry {
    pub status: JobState,
    pub eval_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
    pub message: String,
}

impl JobStatusEntry {
    pub fn completed(eval_id: impl Into<String>, results: serde_json::Value) -> Self {
        Self {
            status: JobState::Completed,
            eval_id: eval_id.into(),
            results: Some(results),
            error: None,
            reason: None,
            message: "Evaluation completed successfully".into(),
        }
    }

    pub fn failed(
        eval_id: impl Into<String>,
        reason: FailureReason,
        error: impl Into<String>,
    ) -> Self {
        let error = error.into();
        let message = match reason {
            FailureReason::ProcessError => "Evaluation failed - computation error".to_string(),
            FailureReason::MissingResults => {
                "Evaluation failed - results artifact not generated".to_string()
            }
            FailureReason::InternalError => format!("Evaluation failed: {error}"),
        };
        Self {
            status: JobState::Failed,
            eval_id: eval_id.into(),
            results: None,
            error: Some(error),
            reason: Some(reason),
            message,
        }
    }

    /// The entry matching a terminal record, `None` while it is still
    /// `pending` or `running`.
    pub fn for_record(record: &EvaluationRecord) -> Option<Self> {
        match record.status {
            EvaluationStatus::Completed => Some(Self::completed(
                record.eval_id.clone(),
                record.results.clone().unwrap_or(serde_json::Value::Null),
            )),
            EvaluationStatus::Failed => Some(Self::failed(
                record.eval_id.clone(),
                record.failure_reason.unwrap_or(FailureReason::InternalError),
                record.error_detail.clone().unwrap_or_default(),
            )),
            EvaluationStatus::Pending | EvaluationStatus::Running => None,
        }
    }
}
