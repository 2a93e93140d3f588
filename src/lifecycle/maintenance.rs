//! Periodic shield upkeep.
//!
//! One task owns two tickers: the metrics tick (short, closes the attack
//! metrics window) and the cleanup tick (long, drops idle per-key state).
//! It exits on the shutdown broadcast.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::MaintenanceConfig;
use crate::shield::{Severity, Shield};

pub struct Maintenance {
    shield: Arc<Shield>,
    metrics_interval: Duration,
    cleanup_interval: Duration,
}

impl Maintenance {
    pub fn new(shield: Arc<Shield>, config: &MaintenanceConfig) -> Self {
        Self {
            shield,
            metrics_interval: Duration::from_millis(config.metrics_interval_ms.max(1)),
            cleanup_interval: Duration::from_secs(config.cleanup_interval_secs.max(1)),
        }
    }

    /// Run until `shutdown` fires.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            metrics_interval_ms = self.metrics_interval.as_millis() as u64,
            cleanup_interval_secs = self.cleanup_interval.as_secs(),
            "Maintenance task starting"
        );

        let mut metrics_ticker = time::interval_at(Instant::now() + self.metrics_interval, self.metrics_interval);
        let mut cleanup_ticker = time::interval_at(Instant::now() + self.cleanup_interval, self.cleanup_interval);
        metrics_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        cleanup_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last_severity = Severity::Low;
        loop {
            tokio::select! {
                _ = metrics_ticker.tick() => {
                    let metrics = self.shield.tick_metrics();
                    if metrics.severity != last_severity {
                        tracing::warn!(
                            from = last_severity.as_str(),
                            to = metrics.severity.as_str(),
                            rps = metrics.requests_per_second,
                            "Attack severity changed"
                        );
                        last_severity = metrics.severity;
                    }
                }
                _ = cleanup_ticker.tick() => {
                    let report = self.shield.cleanup();
                    tracing::debug!(
                        rate_limiters = report.rate_limiters,
                        reputations = report.reputations,
                        breakers = report.breakers,
                        "Cleanup pass complete"
                    );
                }
                _ = shutdown.recv() => {
                    tracing::info!("Maintenance received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
