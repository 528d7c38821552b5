#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for ledger seam operations.
pub const TRACING_TARGET_LEDGER: &str = "vellum_core::ledger";

/// Tracing target for blob store seam operations.
pub const TRACING_TARGET_BLOB: &str = "vellum_core::blob";

mod blob;
mod error;
mod health;
mod ledger;
mod media;
mod object;

#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod mock;

#[doc(hidden)]
pub mod prelude;

pub use blob::BlobStore;
pub use error::{BoxedError, Error, ErrorKind, Result};
pub use health::{HealthReport, HealthStatus};
pub use ledger::MediaLedger;
pub use media::{Media, MediaId, MediaMeta, MediaRecord, NewMedia};
pub use object::{ObjectInfo, ObjectKey, PutObject, RESERVED_NAMESPACE};
