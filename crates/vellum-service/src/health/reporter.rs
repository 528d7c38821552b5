//! Sinks for health probe outcomes.

use vellum_core::HealthReport;

use crate::TRACING_TARGET_HEALTH;

/// Receives the outcome of every background health probe.
///
/// Called from the monitor task; implementations should not block.
pub trait HealthReporter: Send + Sync {
    /// Handles one probe outcome.
    fn report(&self, report: &HealthReport);
}

/// Reporter that logs healthy probes at `debug` and failures at `error`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl HealthReporter for TracingReporter {
    fn report(&self, report: &HealthReport) {
        let latency_ms = report.latency.map(|l| l.as_millis());
        if report.is_healthy() {
            tracing::debug!(
                target: TRACING_TARGET_HEALTH,
                latency_ms,
                checked_at = %report.checked_at,
                "Blob store healthy"
            );
        } else {
            tracing::error!(
                target: TRACING_TARGET_HEALTH,
                latency_ms,
                checked_at = %report.checked_at,
                error = report.message.as_deref().unwrap_or("unknown"),
                "Blob store health check failed"
            );
        }
    }
}
