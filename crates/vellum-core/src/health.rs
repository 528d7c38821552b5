//! Health reporting for the blob store connection.
//!
//! A [`HealthReport`] is produced by each probe of the storage backend and
//! handed to whoever is watching (a background monitor, a CLI command).

use std::time::Duration;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Outcome of a single health probe.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// The probe write succeeded.
    #[default]
    Healthy,
    /// The probe write failed.
    Unhealthy,
}

/// Health information for the storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Probe outcome.
    pub status: HealthStatus,
    /// Probe round trip time.
    pub latency: Option<Duration>,
    /// Failure description when unhealthy.
    pub message: Option<String>,
    /// When the probe completed.
    pub checked_at: Timestamp,
}

impl HealthReport {
    /// Creates a healthy report.
    pub fn healthy() -> Self {
        Self {
            status: HealthStatus::Healthy,
            latency: None,
            message: None,
            checked_at: Timestamp::now(),
        }
    }

    /// Creates an unhealthy report.
    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            latency: None,
            message: Some(message.into()),
            checked_at: Timestamp::now(),
        }
    }

    /// Sets the probe round trip time.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Returns whether the probe succeeded.
    #[inline]
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn healthy_report() {
        let report = HealthReport::healthy().with_latency(Duration::from_millis(5));
        assert!(report.is_healthy());
        assert_eq!(report.latency, Some(Duration::from_millis(5)));
        assert!(report.message.is_none());
    }

    #[test]
    fn unhealthy_report_serializes_status() {
        let report = HealthReport::unhealthy("bucket unreachable");
        assert!(!report.is_healthy());
        let json = serde_json::to_value(&report).expect("serialize");
        assert_eq!(json["status"], "unhealthy");
        assert_eq!(json["message"], "bucket unreachable");
    }
}
