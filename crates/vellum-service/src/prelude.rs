//! Convenient re-exports for common use.

pub use vellum_core::prelude::*;

pub use crate::config::MediaStoreConfig;
pub use crate::health::{HealthMonitor, HealthMonitorHandle, HealthReporter};
pub use crate::store::MediaStore;
