//! Shared helpers for API integration tests.
//!
//! The app is built with [`build_app_router`] over in-memory backends and a
//! scripted computation, so no database or Python environment is needed.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use fairscope_api::config::{EvaluationSettings, ServerConfig};
use fairscope_api::router::build_app_router;
use fairscope_api::state::AppState;
use fairscope_core::computation::{ComputationOutcome, ComputationRequest, ExternalComputation};
use fairscope_core::config::artifact::ArtifactLayout;
use fairscope_pipeline::{Backends, EvaluationService};

pub const TENANT: &str = "acme";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(artifact_root: &std::path::Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        database_url: None,
        evaluation: EvaluationSettings {
            artifact_root: artifact_root.to_path_buf(),
            module_dir: artifact_root.to_path_buf(),
            python: "python3".to_string(),
            item_limit: 50,
            computation_timeout: None,
            status_ttl: Duration::from_secs(3600),
            status_purge_interval: Duration::from_secs(300),
        },
    }
}

/// Computation that writes fixed results, or fails with `stderr` when
/// `results` is `None`.
pub struct ScriptedComputation {
    pub results: Option<serde_json::Value>,
    pub stderr: &'static str,
}

#[async_trait]
impl ExternalComputation for ScriptedComputation {
    async fn run(&self, request: &ComputationRequest) -> ComputationOutcome {
        match &self.results {
            Some(results) => {
                tokio::fs::write(&request.output_path, results.to_string())
                    .await
                    .unwrap();
                ComputationOutcome {
                    exit_code: Some(0),
                    stderr: String::new(),
                    artifact: Some(request.output_path.clone()),
                }
            }
            None => ComputationOutcome {
                exit_code: Some(1),
                stderr: self.stderr.to_string(),
                artifact: None,
            },
        }
    }
}

/// A running test app plus handles needed to observe it.
pub struct TestApp {
    pub router: Router,
    pub service: Arc<EvaluationService>,
    _artifacts: tempfile::TempDir,
}

impl TestApp {
    /// Wait for every dispatched run to finish.
    pub async fn settle(&self) {
        assert!(self.service.shutdown(Duration::from_secs(5)).await);
    }
}

/// Build the full application router with all middleware layers.
pub fn build_test_app(computation: ScriptedComputation) -> TestApp {
    let artifacts = tempfile::tempdir().unwrap();
    let config = test_config(artifacts.path());

    let service = Arc::new(EvaluationService::new(
        Backends::in_memory(config.evaluation.status_ttl),
        Arc::new(computation),
        ArtifactLayout::new(artifacts.path()),
        config.evaluation.item_limit,
    ));

    let state = AppState {
        config: Arc::new(config.clone()),
        service: Arc::clone(&service),
        pool: None,
    };

    TestApp {
        router: build_app_router(state, &config),
        service,
        _artifacts: artifacts,
    }
}

pub fn succeeding() -> ScriptedComputation {
    ScriptedComputation {
        results: Some(serde_json::json!({"performance": {"accuracy": 0.82}})),
        stderr: "",
    }
}

pub fn failing(stderr: &'static str) -> ScriptedComputation {
    ScriptedComputation {
        results: None,
        stderr,
    }
}

/// Send a request, optionally with the tenant header and a JSON body.
pub async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    tenant: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(tenant) = tenant {
        builder = builder.header("x-tenant-id", tenant);
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    app.router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap()
}

/// GET as the default tenant.
pub async fn get(app: &TestApp, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(TENANT), None).await
}

/// Collect and parse a JSON response body.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
