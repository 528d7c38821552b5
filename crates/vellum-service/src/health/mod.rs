//! Background health monitoring of the blob store.

mod monitor;
mod reporter;

pub use monitor::{HealthMonitor, HealthMonitorHandle};
pub use reporter::{HealthReporter, TracingReporter};
