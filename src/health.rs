//! Connection health probing (`spec.md` §6's health-probe collaborator
//! contract). Not core protocol logic: a probe is just a timed call to
//! `Client.get_attributes(".")`, with the resulting pass/fail history
//! classified into a four-state status.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::warn;

use crate::config::HealthOptions;
use crate::engine::FileAttributes;
use crate::error::NfsError;

/// Connection health, inferred from consecutive probe outcomes rather than
/// any single call: one failure degrades, `unhealthy_threshold` in a row
/// marks the connection unhealthy, one success resets to healthy.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum HealthStatus {
    /// No probe has completed yet.
    #[default]
    Unknown,
    Healthy,
    Degraded,
    Unhealthy,
}

/// The outcome of one probe call.
#[derive(Clone, Debug)]
pub struct HealthCheckResult {
    pub healthy: bool,
    pub latency: Duration,
    pub message: String,
    pub error: Option<String>,
}

/// Tracks the health of one connection across repeated probes.
pub struct HealthProbe {
    options: HealthOptions,
    status: HealthStatus,
    consecutive_failures: u32,
}

impl HealthProbe {
    pub fn new(options: HealthOptions) -> Self {
        Self { options, status: HealthStatus::Unknown, consecutive_failures: 0 }
    }

    pub fn status(&self) -> HealthStatus {
        self.status
    }

    /// Runs one probe via `ping` (the caller's `Client::get_attributes(".")`),
    /// updating status per consecutive-failure count.
    pub async fn check<F, Fut>(&mut self, ping: F) -> HealthCheckResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<FileAttributes, NfsError>>,
    {
        let start = Instant::now();
        let outcome = tokio::time::timeout(self.options.health_check_timeout, ping()).await;
        let latency = start.elapsed();
        match outcome {
            Ok(Ok(_)) => {
                self.consecutive_failures = 0;
                self.status = HealthStatus::Healthy;
                HealthCheckResult { healthy: true, latency, message: "ok".to_string(), error: None }
            }
            Ok(Err(err)) => {
                self.record_failure();
                HealthCheckResult {
                    healthy: false,
                    latency,
                    message: format!("probe failed: {err}"),
                    error: Some(err.to_string()),
                }
            }
            Err(_) => {
                self.record_failure();
                HealthCheckResult {
                    healthy: false,
                    latency,
                    message: "probe timed out".to_string(),
                    error: Some(NfsError::Timeout.to_string()),
                }
            }
        }
    }

    fn record_failure(&mut self) {
        self.consecutive_failures += 1;
        self.status = if self.consecutive_failures >= self.options.unhealthy_threshold {
            HealthStatus::Unhealthy
        } else {
            HealthStatus::Degraded
        };
    }

    /// Spawns a background task calling `check(ping)` on
    /// `options.heartbeat_interval` cadence until aborted. The caller decides
    /// whether to spawn this at all (`options.auto_heartbeat`).
    pub fn spawn_heartbeat<F, Fut>(probe: Arc<Mutex<Self>>, ping: F) -> tokio::task::JoinHandle<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<FileAttributes, NfsError>> + Send,
    {
        tokio::spawn(async move {
            let period = probe.lock().await.options.heartbeat_interval;
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let result = probe.lock().await.check(&ping).await;
                if !result.healthy {
                    warn!(message = %result.message, "health probe reported failure");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(threshold: u32) -> HealthOptions {
        HealthOptions { unhealthy_threshold: threshold, ..HealthOptions::default() }
    }

    #[tokio::test]
    async fn success_reports_healthy_and_resets_failures() {
        let mut probe = HealthProbe::new(options(2));
        let result = probe.check(|| async { Ok(FileAttributes::default()) }).await;
        assert!(result.healthy);
        assert_eq!(probe.status(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn failures_below_threshold_are_degraded() {
        let mut probe = HealthProbe::new(options(3));
        probe.check(|| async { Err(NfsError::Connection("down".to_string())) }).await;
        assert_eq!(probe.status(), HealthStatus::Degraded);
    }

    #[tokio::test]
    async fn failures_at_threshold_are_unhealthy() {
        let mut probe = HealthProbe::new(options(2));
        probe.check(|| async { Err(NfsError::Connection("down".to_string())) }).await;
        probe.check(|| async { Err(NfsError::Connection("down".to_string())) }).await;
        assert_eq!(probe.status(), HealthStatus::Unhealthy);
    }

    #[tokio::test]
    async fn a_later_success_recovers_from_unhealthy() {
        let mut probe = HealthProbe::new(options(1));
        probe.check(|| async { Err(NfsError::Connection("down".to_string())) }).await;
        assert_eq!(probe.status(), HealthStatus::Unhealthy);
        probe.check(|| async { Ok(FileAttributes::default()) }).await;
        assert_eq!(probe.status(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn timeout_counts_as_a_failure() {
        let mut probe = HealthProbe::new(HealthOptions {
            health_check_timeout: Duration::from_millis(5),
            unhealthy_threshold: 1,
            ..HealthOptions::default()
        });
        let result = probe
            .check(|| async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(FileAttributes::default())
            })
            .await;
        assert!(!result.healthy);
        assert_eq!(probe.status(), HealthStatus::Unhealthy);
    }
}
