#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for coordinator operations.
pub const TRACING_TARGET_STORE: &str = "vellum_service::store";

/// Tracing target for health probes and the background monitor.
pub const TRACING_TARGET_HEALTH: &str = "vellum_service::health";

mod config;
mod health;
mod store;

#[doc(hidden)]
pub mod prelude;

pub use config::{
    DEFAULT_TIMEOUT_SECS, MediaStoreConfig, MediaStoreConfigBuilder, MediaStoreConfigBuilderError,
};
pub use health::{HealthMonitor, HealthMonitorHandle, HealthReporter, TracingReporter};
pub use store::{DEFAULT_DELETE_CONCURRENCY, MediaStore, MediaStoreBuilder};
pub use vellum_opendal::StorageProvider;
