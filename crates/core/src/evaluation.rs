//! Evaluation record types and the lifecycle state machine.
//!
//! ```text
//! pending -> running -> completed
//!                   \-> failed
//! ```
//!
//! `completed` and `failed` are terminal. Re-writing the status a record
//! already holds is accepted as a no-op so that retried terminal writes from
//! the runner are harmless.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

/// Status ID type matching the SMALLINT `evaluation_statuses` lookup table.
pub type StatusId = i16;

// ---------------------------------------------------------------------------
// EvaluationStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of an evaluation record.
///
/// Discriminants match the seed order of the `evaluation_statuses` table.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    Pending = 1,
    Running = 2,
    Completed = 3,
    Failed = 4,
}

impl EvaluationStatus {
    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    /// Map a database status ID back to a status.
    pub fn from_id(id: StatusId) -> Option<Self> {
        match id {
            1 => Some(Self::Pending),
            2 => Some(Self::Running),
            3 => Some(Self::Completed),
            4 => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// `completed` and `failed` admit no further transition.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether `self -> next` is an edge of the lifecycle graph.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }
}

impl fmt::Display for EvaluationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvaluationStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(CoreError::Validation(format!(
                "Unknown evaluation status '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// FailureReason
// ---------------------------------------------------------------------------

/// Why an evaluation ended in `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The external computation exited abnormally.
    ProcessError,
    /// The external computation exited cleanly but wrote no results artifact.
    MissingResults,
    /// The orchestrator itself failed (storage unavailable, unreadable results).
    InternalError,
}

impl FailureReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProcessError => "process_error",
            Self::MissingResults => "missing_results",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailureReason {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "process_error" => Ok(Self::ProcessError),
            "missing_results" => Ok(Self::MissingResults),
            "internal_error" => Ok(Self::InternalError),
            other => Err(CoreError::Validation(format!(
                "Unknown failure reason '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A durable, tenant-owned evaluation record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationRecord {
    pub eval_id: String,
    pub tenant: String,
    pub model_name: String,
    pub dataset_name: String,
    pub model_task: String,
    pub label_behavior: String,
    /// Serialized copy of the materialized configuration.
    pub config: serde_json::Value,
    pub status: EvaluationStatus,
    /// Parsed results artifact; set only once `completed`.
    pub results: Option<serde_json::Value>,
    pub failure_reason: Option<FailureReason>,
    pub error_detail: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Input for creating a new evaluation record in `pending`.
#[derive(Debug, Clone)]
pub struct NewEvaluation {
    pub eval_id: String,
    pub tenant: String,
    pub model_name: String,
    pub dataset_name: String,
    pub model_task: String,
    pub label_behavior: String,
    pub config: serde_json::Value,
}

/// A requested status change for an existing record.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub status: EvaluationStatus,
    pub results: Option<serde_json::Value>,
    pub failure: Option<(FailureReason, String)>,
}

impl StatusUpdate {
    pub fn running() -> Self {
        Self {
            status: EvaluationStatus::Running,
            results: None,
            failure: None,
        }
    }

    pub fn completed(results: serde_json::Value) -> Self {
        Self {
            status: EvaluationStatus::Completed,
            results: Some(results),
            failure: None,
        }
    }

    pub fn failed(reason: FailureReason, detail: impl Into<String>) -> Self {
        Self {
            status: EvaluationStatus::Failed,
            results: None,
            failure: Some((reason, detail.into())),
        }
    }
}

/// Result of checking a requested transition against the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Write the new status.
    Apply,
    /// The record already holds this status; leave it untouched.
    Unchanged,
}

/// Check `current -> next` against the lifecycle graph.
///
/// Same-status writes for anything but `pending` are [`Transition::Unchanged`].
/// Every other edge outside the graph is a [`CoreError::Conflict`].
pub fn check_transition(
    current: EvaluationStatus,
    next: EvaluationStatus,
) -> Result<Transition, CoreError> {
    if current == next && next != EvaluationStatus::Pending {
        return Ok(Transition::Unchanged);
    }
    if current.can_transition_to(next) {
        return Ok(Transition::Apply);
    }
    Err(CoreError::Conflict(format!(
        "Invalid evaluation status transition: {current} -> {next}"
    )))
}

/// Apply a checked update to an in-memory record, stamping `updated_at`.
///
/// Returns `true` if the record changed.
pub fn apply_update(
    record: &mut EvaluationRecord,
    update: &StatusUpdate,
    now: Timestamp,
) -> Result<bool, CoreError> {
    match check_transition(record.status, update.status)? {
        Transition::Unchanged => Ok(false),
        Transition::Apply => {
            record.status = update.status;
            if update.results.is_some() {
                record.results = update.results.clone();
            }
            if let Some((reason, detail)) = &update.failure {
                record.failure_reason = Some(*reason);
                record.error_detail = Some(detail.clone());
            }
            record.updated_at = now;
            Ok(true)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
