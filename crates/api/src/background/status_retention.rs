//! Periodic sweep of expired transient job status entries.
//!
//! Expired entries are already invisible to readers; this only reclaims
//! storage. Runs on a fixed interval using `tokio::time::interval`.

use std::sync::Arc;
use std::time::Duration;

use fairscope_core::store::StatusStore;
use tokio_util::sync::CancellationToken;

/// Run the status retention loop until `cancel` is triggered.
pub async fn run(statuses: Arc<dyn StatusStore>, interval: Duration, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = interval.as_secs(),
        "Status retention job started"
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Status retention job stopping");
                break;
            }
            _ = ticker.tick() => {
                match statuses.purge_expired().await {
                    Ok(purged) => {
                        if purged > 0 {
                            tracing::info!(purged, "Status retention: purged expired entries");
                        } else {
                            tracing::debug!("Status retention: nothing to purge");
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Status retention: purge failed");
                    }
                }
            }
        }
    }
}
