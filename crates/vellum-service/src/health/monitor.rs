//! Periodic blob store probing.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use vellum_core::HealthReport;

use super::{HealthReporter, TracingReporter};
use crate::{MediaStore, TRACING_TARGET_HEALTH};

/// Background task probing the blob store at a fixed interval.
///
/// The loop sleeps, probes and reports until cancelled. It does not back off
/// and does not stop on failure.
pub struct HealthMonitor {
    store: MediaStore,
    interval: Duration,
    reporter: Arc<dyn HealthReporter>,
}

impl HealthMonitor {
    /// Creates a monitor that reports through [`TracingReporter`].
    pub fn new(store: MediaStore, interval: Duration) -> Self {
        Self {
            store,
            interval,
            reporter: Arc::new(TracingReporter),
        }
    }

    /// Replaces the reporter.
    pub fn with_reporter(mut self, reporter: Arc<dyn HealthReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Spawns the monitor as a background task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(self) -> HealthMonitorHandle {
        let cancel_token = CancellationToken::new();
        let task = tokio::spawn(self.run(cancel_token.clone()));

        HealthMonitorHandle {
            cancel_token,
            task: Some(task),
        }
    }

    #[tracing::instrument(
        skip_all,
        fields(interval_secs = self.interval.as_secs_f64()),
        target = TRACING_TARGET_HEALTH,
        name = "health_monitor"
    )]
    async fn run(self, cancel_token: CancellationToken) {
        tracing::info!(target: TRACING_TARGET_HEALTH, "Starting health monitor");

        loop {
            tokio::select! {
                biased;
                () = cancel_token.cancelled() => break,
                () = tokio::time::sleep(self.interval) => {}
            }

            let start = Instant::now();
            let report = tokio::select! {
                biased;
                () = cancel_token.cancelled() => break,
                result = self.store.health_check() => match result {
                    Ok(report) => report,
                    Err(err) => HealthReport::unhealthy(err.to_string())
                        .with_latency(start.elapsed()),
                },
            };

            self.reporter.report(&report);
        }

        tracing::info!(target: TRACING_TARGET_HEALTH, "Health monitor stopped");
    }
}

/// Handle to a running [`HealthMonitor`].
///
/// Dropping the handle cancels the monitor without waiting for it.
#[must_use = "dropping the handle stops the monitor"]
pub struct HealthMonitorHandle {
    cancel_token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl HealthMonitorHandle {
    /// Returns whether the monitor task is still running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stops the monitor and waits for the task to finish.
    pub async fn shutdown(mut self) {
        self.cancel_token.cancel();
        let Some(task) = self.task.take() else {
            return;
        };

        if let Err(err) = task.await {
            tracing::error!(
                target: TRACING_TARGET_HEALTH,
                error = %err,
                "Health monitor task did not exit cleanly"
            );
        }
    }
}

impl Drop for HealthMonitorHandle {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}
