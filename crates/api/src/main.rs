use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fairscope_api::background;
use fairscope_api::config::ServerConfig;
use fairscope_api::router::build_app_router;
use fairscope_api::state::AppState;
use fairscope_core::computation::process::{ProcessComputation, DEFAULT_BASE_ARGS};
use fairscope_core::config::artifact::ArtifactLayout;
use fairscope_db::stores::{PgEvaluationStore, PgJobSequencer, PgStatusStore};
use fairscope_pipeline::{Backends, EvaluationService};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "fairscope_api=debug,fairscope_pipeline=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let settings = &config.evaluation;

    // --- Storage backends ---
    let (backends, pool) = match &config.database_url {
        Some(database_url) => {
            let pool = fairscope_db::create_pool(database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            fairscope_db::health_check(&pool)
                .await
                .expect("Database health check failed");
            tracing::info!("Database health check passed");

            fairscope_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            let backends = Backends {
                sequencer: Arc::new(PgJobSequencer::new(pool.clone())),
                evaluations: Arc::new(PgEvaluationStore::new(pool.clone())),
                statuses: Arc::new(PgStatusStore::new(pool.clone(), settings.status_ttl)),
            };
            (backends, Some(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory backends");
            (Backends::in_memory(settings.status_ttl), None)
        }
    };

    // --- Evaluation service ---
    let computation = ProcessComputation::new(&settings.module_dir)
        .with_program(
            settings.python.clone(),
            DEFAULT_BASE_ARGS.iter().map(|a| a.to_string()).collect(),
        )
        .with_timeout(settings.computation_timeout);

    let service = Arc::new(EvaluationService::new(
        backends,
        Arc::new(computation),
        ArtifactLayout::new(&settings.artifact_root),
        settings.item_limit,
    ));
    tracing::info!(
        artifact_root = %settings.artifact_root.display(),
        module_dir = %settings.module_dir.display(),
        item_limit = settings.item_limit,
        "Evaluation service ready",
    );

    // --- Status retention ---
    let retention_cancel = tokio_util::sync::CancellationToken::new();
    let retention_handle = tokio::spawn(background::status_retention::run(
        Arc::clone(service.statuses()),
        settings.status_purge_interval,
        retention_cancel.clone(),
    ));

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        service: Arc::clone(&service),
        pool,
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    retention_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), retention_handle).await;
    tracing::info!("Status retention stopped");

    let in_flight = service.in_flight();
    tracing::info!(in_flight, "Waiting for in-flight evaluations");
    if service
        .shutdown(Duration::from_secs(config.shutdown_timeout_secs))
        .await
    {
        tracing::info!("All evaluation runs finished");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server shuts
/// down cleanly whether stopped interactively or by a process manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
