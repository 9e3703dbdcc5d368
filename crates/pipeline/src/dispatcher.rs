//! Fire-and-forget execution of evaluation runs.
//!
//! One Tokio task per accepted submission, tracked by a [`TaskTracker`] so
//! graceful shutdown can wait for in-flight runs.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::task::TaskTracker;
use tracing::Instrument;

use crate::runner::{EvaluationRunner, RunOutcome, RunRequest};

pub struct Dispatcher {
    runner: Arc<EvaluationRunner>,
    tracker: TaskTracker,
}

impl Dispatcher {
    pub fn new(runner: Arc<EvaluationRunner>) -> Self {
        Self {
            runner,
            tracker: TaskTracker::new(),
        }
    }

    /// Start a run in the background and return immediately.
    pub fn dispatch(&self, request: RunRequest) {
        let runner = Arc::clone(&self.runner);
        let span = tracing::info_span!(
            "evaluation_run",
            job_id = request.job_id,
            eval_id = %request.eval_id,
            tenant = %request.tenant,
        );

        self.tracker.spawn(
            async move {
                match runner.run(&request).await {
                    RunOutcome::Completed => tracing::info!("Evaluation run finished"),
                    RunOutcome::Failed(reason) => {
                        tracing::info!(%reason, "Evaluation run finished with failure")
                    }
                }
            }
            .instrument(span),
        );
    }

    /// Number of runs still executing.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Close the tracker and wait up to `timeout` for in-flight runs.
    ///
    /// Returns `false` if runs were still going at the deadline.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.tracker.close();
        match tokio::time::timeout(timeout, self.tracker.wait()).await {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(
                    in_flight = self.tracker.len(),
                    timeout_secs = timeout.as_secs(),
                    "Evaluation runs still in flight at shutdown deadline",
                );
                false
            }
        }
    }
}
