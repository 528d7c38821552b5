//! Convenient re-exports for common use.

pub use crate::blob::BlobStore;
pub use crate::error::{BoxedError, Error, ErrorKind, Result};
pub use crate::health::{HealthReport, HealthStatus};
pub use crate::ledger::MediaLedger;
pub use crate::media::{Media, MediaId, MediaMeta, MediaRecord, NewMedia};
pub use crate::object::{ObjectInfo, ObjectKey, PutObject};
