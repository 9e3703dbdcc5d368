//! [`ExternalComputation`] backed by a child process.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::subprocess::{run_command, ProcessError};
use super::{ComputationOutcome, ComputationRequest, ExternalComputation};

/// Default interpreter for the bias/fairness module.
pub const DEFAULT_PROGRAM: &str = "python3";

/// Default leading arguments: the module's prompt-mode CLI entry point.
pub const DEFAULT_BASE_ARGS: &[&str] = &["-m", "src.core.cli", "prompt"];

/// Runs `program base_args.. --config <path> --limit <n> --output <path>`
/// inside `working_dir`.
///
/// Relative artifact paths are resolved against this process's working
/// directory before they reach the child.
#[derive(Debug, Clone)]
pub struct ProcessComputation {
    program: String,
    base_args: Vec<String>,
    working_dir: PathBuf,
    timeout: Option<Duration>,
}

impl ProcessComputation {
    /// Default CLI invocation run from `working_dir`.
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            base_args: DEFAULT_BASE_ARGS.iter().map(|a| a.to_string()).collect(),
            working_dir: working_dir.into(),
            timeout: None,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>, base_args: Vec<String>) -> Self {
        self.program = program.into();
        self.base_args = base_args;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn command(&self, config_path: &Path, output_path: &Path, limit: u32) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.base_args)
            .arg("--config")
            .arg(config_path)
            .arg("--limit")
            .arg(limit.to_string())
            .arg("--output")
            .arg(output_path)
            .current_dir(&self.working_dir);
        cmd
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[async_trait]
impl ExternalComputation for ProcessComputation {
    async fn run(&self, request: &ComputationRequest) -> ComputationOutcome {
        let config_path = absolute(&request.config_path);
        let output_path = absolute(&request.output_path);
        let mut cmd = self.command(&config_path, &output_path, request.limit);

        tracing::debug!(
            program = %self.program,
            config = %config_path.display(),
            output = %output_path.display(),
            limit = request.limit,
            "Starting external computation",
        );

        let (exit_code, stderr) = match run_command(&mut cmd, self.timeout).await {
            Ok(output) => {
                tracing::debug!(
                    exit_code = ?output.exit_code,
                    duration_ms = output.duration_ms,
                    stdout_bytes = output.stdout.len(),
                    "External computation finished",
                );
                (output.exit_code, output.stderr)
            }
            Err(e @ ProcessError::Timeout { .. }) => {
                tracing::warn!(error = %e, "External computation timed out");
                (None, e.to_string())
            }
            Err(e) => {
                tracing::warn!(error = %e, "External computation could not run");
                (None, e.to_string())
            }
        };

        let artifact = match tokio::fs::try_exists(&output_path).await {
            Ok(true) => Some(output_path),
            _ => None,
        };

        ComputationOutcome {
            exit_code,
            stderr,
            artifact,
        }
    }
}
