use std::sync::Arc;

use fairscope_pipeline::EvaluationService;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything is behind `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Evaluation lifecycle facade.
    pub service: Arc<EvaluationService>,
    /// Database pool, absent when running on in-memory backends.
    pub pool: Option<fairscope_db::DbPool>,
}
