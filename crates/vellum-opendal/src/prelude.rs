//! Prelude module for convenient imports.

pub use crate::backend::StorageBackend;
pub use crate::config::{StorageConfig, StorageProvider};
pub use crate::error::{StorageError, StorageResult};
