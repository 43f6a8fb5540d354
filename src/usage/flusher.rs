//! Background persistence for usage counters.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::observability::metrics;
use crate::unix_now;
use crate::usage::counters::UsageCounters;

pub struct UsageFlusher {
    counters: Arc<UsageCounters>,
    interval: Duration,
}

impl UsageFlusher {
    pub fn new(counters: Arc<UsageCounters>, interval: Duration) -> Self {
        Self { counters, interval }
    }

    /// Flush periodically until shutdown, then flush one last time.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            location = %self.counters.backend_description(),
            "Usage flusher starting"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.counters.compact(unix_now());
                    self.flush().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Usage flusher received shutdown signal, flushing");
                    self.flush().await;
                    break;
                }
            }
        }
    }

    async fn flush(&self) {
        let snapshot = self.counters.snapshot();
        metrics::record_usage_totals(snapshot.total_requests, snapshot.total_visitors);

        match self.counters.flush().await {
            Ok(true) => tracing::debug!(
                total_requests = snapshot.total_requests,
                total_visitors = snapshot.total_visitors,
                "Usage counters flushed"
            ),
            Ok(false) => {}
            Err(e) => {
                metrics::record_persistence_failure("usage");
                tracing::error!(error = %e, "Failed to persist usage counters");
            }
        }
    }
}
