//! Job identifier allocation.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;

use crate::error::CoreError;
use crate::types::JobId;

/// Issues fresh, never-reused job identifiers.
///
/// Implementations must be safe under concurrent callers. A backend that
/// cannot be reached reports [`CoreError::Unavailable`].
#[async_trait]
pub trait JobSequencer: Send + Sync {
    async fn next_id(&self) -> Result<JobId, CoreError>;
}

/// Process-local sequencer backed by an atomic counter.
///
/// Only suitable when a single orchestrator instance runs; multi-instance
/// deployments use the database sequence in `fairscope-db`.
#[derive(Debug, Default)]
pub struct AtomicJobSequencer {
    last: AtomicI64,
}

impl AtomicJobSequencer {
    /// Start issuing ids after `last` (the first id is `last + 1`).
    pub fn starting_after(last: JobId) -> Self {
        Self {
            last: AtomicI64::new(last),
        }
    }
}

#[async_trait]
impl JobSequencer for AtomicJobSequencer {
    async fn next_id(&self) -> Result<JobId, CoreError> {
        Ok(self.last.fetch_add(1, Ordering::SeqCst) + 1)
    }
}
