use std::path::PathBuf;
use std::time::Duration;

use fairscope_core::computation::DEFAULT_ITEM_LIMIT;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development. In production,
/// override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for in-flight evaluations (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Postgres connection string. In-memory backends are used when unset.
    pub database_url: Option<String>,
    /// Evaluation pipeline settings.
    pub evaluation: EvaluationSettings,
}

/// Settings for the evaluation pipeline and the external computation.
#[derive(Debug, Clone)]
pub struct EvaluationSettings {
    /// Absolute root directory for per-evaluation artifacts.
    pub artifact_root: PathBuf,
    /// Working directory of the bias/fairness module.
    pub module_dir: PathBuf,
    /// Interpreter used to launch the module.
    pub python: String,
    /// Evaluation item limit passed to the computation.
    pub item_limit: u32,
    /// Kill the computation after this long. `None` waits indefinitely.
    pub computation_timeout: Option<Duration>,
    /// Lifetime of a transient job status entry.
    pub status_ttl: Duration,
    /// How often expired status entries are swept.
    pub status_purge_interval: Duration,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                    |
    /// |------------------------------|----------------------------|
    /// | `HOST`                       | `0.0.0.0`                  |
    /// | `PORT`                       | `3000`                     |
    /// | `CORS_ORIGINS`               | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`       | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`      | `30`                       |
    /// | `DATABASE_URL`               | unset (in-memory)          |
    /// | `ARTIFACT_ROOT`              | `artifacts/evaluations`    |
    /// | `BIAS_MODULE_DIR`            | `BiasAndFairnessModule`    |
    /// | `BIAS_MODULE_PYTHON`         | `python3`                  |
    /// | `EVALUATION_ITEM_LIMIT`      | `50`                       |
    /// | `COMPUTATION_TIMEOUT_SECS`   | unset (no timeout)         |
    /// | `STATUS_TTL_SECS`            | `86400`                    |
    /// | `STATUS_PURGE_INTERVAL_SECS` | `300`                      |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            database_url,
            evaluation: EvaluationSettings::from_env(),
        }
    }
}

impl EvaluationSettings {
    pub fn from_env() -> Self {
        // Absolute so the computation, which runs inside `module_dir`, finds it.
        let artifact_root = std::path::absolute(
            std::env::var("ARTIFACT_ROOT").unwrap_or_else(|_| "artifacts/evaluations".into()),
        )
        .expect("ARTIFACT_ROOT must resolve against the working directory");

        let module_dir = std::env::var("BIAS_MODULE_DIR")
            .unwrap_or_else(|_| "BiasAndFairnessModule".into())
            .into();

        let python = std::env::var("BIAS_MODULE_PYTHON").unwrap_or_else(|_| "python3".into());

        let item_limit: u32 = std::env::var("EVALUATION_ITEM_LIMIT")
            .unwrap_or_else(|_| DEFAULT_ITEM_LIMIT.to_string())
            .parse()
            .expect("EVALUATION_ITEM_LIMIT must be a valid u32");

        let computation_timeout = std::env::var("COMPUTATION_TIMEOUT_SECS")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                s.parse::<u64>()
                    .expect("COMPUTATION_TIMEOUT_SECS must be a valid u64")
            })
            .map(Duration::from_secs);

        let status_ttl_secs: u64 = std::env::var("STATUS_TTL_SECS")
            .unwrap_or_else(|_| "86400".into())
            .parse()
            .expect("STATUS_TTL_SECS must be a valid u64");

        let status_purge_interval_secs: u64 = std::env::var("STATUS_PURGE_INTERVAL_SECS")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .expect("STATUS_PURGE_INTERVAL_SECS must be a valid u64");
        assert!(
            status_purge_interval_secs > 0,
            "STATUS_PURGE_INTERVAL_SECS must be greater than zero"
        );

        Self {
            artifact_root,
            module_dir,
            python,
            item_limit,
            computation_timeout,
            status_ttl: Duration::from_secs(status_ttl_secs),
            status_purge_interval: Duration::from_secs(status_purge_interval_secs),
        }
    }
}
