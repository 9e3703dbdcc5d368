//! Handlers for the `/evaluations` resource.
//!
//! All endpoints are scoped to the caller's [`Tenant`].

use std::path::PathBuf;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use fairscope_core::error::CoreError;
use fairscope_core::evaluation::EvaluationStatus;
use fairscope_core::types::JobId;

use crate::error::{AppError, AppResult};
use crate::middleware::tenant::Tenant;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of a `202 Accepted` submission response.
#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub job_id: JobId,
    pub eval_id: String,
    pub status: EvaluationStatus,
    pub message: &'static str,
    pub config_path: PathBuf,
}

/// Decode the optional override body. An empty body means "no overrides".
fn parse_overrides(body: &[u8]) -> AppResult<serde_json::Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::Value::Null);
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Request body is not valid JSON: {e}")))
}

/// POST /api/v1/evaluations
///
/// Materialize the config from the body's overrides, create a `pending`
/// record and start the run in the background. Returns 202.
pub async fn submit_evaluation(
    Tenant(tenant): Tenant,
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let overrides = parse_overrides(&body)?;
    let submission = state.service.submit(&tenant, &overrides).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: SubmissionResponse {
                job_id: submission.job_id,
                eval_id: submission.eval_id,
                status: submission.status,
                message: "Configuration created and evaluation started",
                config_path: submission.config_path,
            },
        }),
    ))
}

/// GET /api/v1/evaluations
///
/// All of the tenant's evaluations, newest first.
pub async fn list_evaluations(
    Tenant(tenant): Tenant,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let records = state.service.list_evaluations(&tenant).await?;
    Ok(Json(DataResponse { data: records }))
}

/// GET /api/v1/evaluations/{eval_id}
pub async fn get_evaluation(
    Tenant(tenant): Tenant,
    State(state): State<AppState>,
    Path(eval_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let record = state.service.get_evaluation(&tenant, &eval_id).await?;
    Ok(Json(DataResponse { data: record }))
}

/// DELETE /api/v1/evaluations/{eval_id}
///
/// Returns 204 on success, 404 if the tenant has no such evaluation.
pub async fn delete_evaluation(
    Tenant(tenant): Tenant,
    State(state): State<AppState>,
    Path(eval_id): Path<String>,
) -> AppResult<StatusCode> {
    if state.service.delete_evaluation(&tenant, &eval_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::evaluation_not_found(&eval_id)))
    }
}
