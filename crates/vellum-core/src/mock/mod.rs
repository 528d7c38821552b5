//! In-memory implementations of the storage seams for testing.
//!
//! Both doubles support per-operation fault injection and an artificial
//! delay, so coordinator behavior can be exercised for every failure phase
//! without a database or an object store.
//!
//! # Feature Flag
//!
//! This module is only available when the `test-utils` feature is enabled:
//!
//! ```toml
//! [dev-dependencies]
//! vellum-core = { version = "...", features = ["test-utils"] }
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use vellum_core::mock::{BlobOp, MemoryBlobStore, MemoryLedger};
//!
//! let ledger = MemoryLedger::new();
//! let blobs = MemoryBlobStore::new();
//! blobs.fail(BlobOp::Put);
//! ```

mod blob;
mod ledger;

pub use blob::{BlobOp, MemoryBlobStore, StoredObject};
pub use ledger::{LedgerOp, MemoryLedger};

/// Locks a mutex, recovering the data if a previous holder panicked.
fn lock<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
