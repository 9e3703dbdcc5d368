//! Route definitions for transient job status polling.

use axum::routing::get;
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Routes mounted at `/jobs`.
///
/// ```text
/// GET    /{job_id}/status -> get_job_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{job_id}/status", get(jobs::get_job_status))
}
