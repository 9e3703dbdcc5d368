//! Route definitions for the `/evaluations` resource.
//!
//! All endpoints require the `x-tenant-id` header.

use axum::routing::get;
use axum::Router;

use crate::handlers::evaluations;
use crate::state::AppState;

/// Routes mounted at `/evaluations`.
///
/// ```text
/// GET    /                -> list_evaluations
/// POST   /                -> submit_evaluation
/// GET    /{eval_id}       -> get_evaluation
/// DELETE /{eval_id}       -> delete_evaluation
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(evaluations::list_evaluations).post(evaluations::submit_evaluation),
        )
        .route(
            "/{eval_id}",
            get(evaluations::get_evaluation).delete(evaluations::delete_evaluation),
        )
}
