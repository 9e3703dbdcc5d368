//! The external bias/fairness computation, seen as a black box.
//!
//! The orchestrator only knows [`ExternalComputation::run`]: hand over a
//! config artifact and an output path, get back an exit status, the error
//! stream, and whether a results artifact appeared. Abnormal exits, spawn
//! failures and timeouts are all reported as data in [`ComputationOutcome`].

pub mod process;
pub mod subprocess;

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;

/// Default number of evaluation items the computation processes.
pub const DEFAULT_ITEM_LIMIT: u32 = 50;

/// Fixed invocation parameters for one computation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputationRequest {
    /// Location of the rendered config artifact.
    pub config_path: PathBuf,
    /// Where the computation must write its results artifact.
    pub output_path: PathBuf,
    /// Evaluation item limit.
    pub limit: u32,
}

/// What came back from a computation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComputationOutcome {
    /// Process exit code; `None` if the process never ran, was killed by a
    /// signal, or timed out.
    pub exit_code: Option<i32>,
    /// Captured standard error (or a description of why the run was abnormal).
    pub stderr: String,
    /// The results artifact, if it exists after the run.
    pub artifact: Option<PathBuf>,
}

impl ComputationOutcome {
    /// Exit code zero.
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Human-readable failure detail: stderr verbatim, or a fallback naming
    /// the exit status when stderr is empty.
    pub fn failure_detail(&self) -> String {
        if !self.stderr.trim().is_empty() {
            return self.stderr.clone();
        }
        match self.exit_code {
            Some(code) => format!("External computation exited with code {code}"),
            None => "External computation terminated abnormally".to_string(),
        }
    }
}

/// Capability to run the external computation.
#[async_trait]
pub trait ExternalComputation: Send + Sync {
    /// Run to completion. Never fails: every abnormal end is captured in the
    /// returned outcome.
    async fn run(&self, request: &ComputationRequest) -> ComputationOutcome;
}
