//! Handler for transient job status polling.
//!
//! A poll consumes the entry: it is returned once and then gone. Absent
//! entries answer 204, and so do entries of jobs submitted by another tenant.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use fairscope_core::types::JobId;

use crate::error::AppResult;
use crate::middleware::tenant::Tenant;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /api/v1/jobs/{job_id}/status`.
#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    /// Read without consuming.
    #[serde(default)]
    pub peek: bool,
}

/// GET /api/v1/jobs/{job_id}/status
pub async fn get_job_status(
    Tenant(tenant): Tenant,
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
    Query(query): Query<StatusQuery>,
) -> AppResult<Response> {
    let entry = if query.peek {
        state.service.peek_job(&tenant, job_id).await?
    } else {
        state.service.poll_job(&tenant, job_id).await?
    };

    match entry {
        Some(entry) => {
            tracing::debug!(job_id, %tenant, peek = query.peek, "Job status delivered");
            Ok(Json(DataResponse { data: entry }).into_response())
        }
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}
