pub mod evaluations;
pub mod health;
pub mod jobs;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /evaluations                     list, submit
/// /evaluations/{eval_id}           get, delete
///
/// /jobs/{job_id}/status            poll (consume) or ?peek=true
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/evaluations", evaluations::router())
        .nest("/jobs", jobs::router())
}
