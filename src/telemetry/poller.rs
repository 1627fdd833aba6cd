//! Keep-alive stats poller.
//!
//! The stats endpoint pushes one snapshot per `ue_get` request, so someone
//! has to keep asking. This task fires a request every poll interval for as
//! long as the sweep runs; the ingest loop consumes whatever comes back.

use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::client::TelemetryRequester;

/// Periodic `ue_get` requester.
pub struct StatsPoller {
    requester: TelemetryRequester,
    interval: Duration,
    cancel: CancellationToken,
}

impl StatsPoller {
    pub fn new(requester: TelemetryRequester, interval: Duration, cancel: CancellationToken) -> Self {
        Self {
            requester,
            interval,
            cancel,
        }
    }

    /// Runs until cancellation. Send failures are logged and ignored; the
    /// writer is absent while the read path reconnects, and requests resume
    /// once it comes back.
    pub async fn run(self) {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            "Stats poller started"
        );

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("[StatsPoller] Shutdown signal received");
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {
                    if let Err(e) = self.requester.request_stats().await {
                        debug!("[StatsPoller] Keep-alive request failed: {}", e);
                    }
                }
            }
        }
    }
}
