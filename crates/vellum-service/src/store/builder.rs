//! Construction of [`MediaStore`].

use std::sync::Arc;
use std::time::Duration;

use vellum_core::{BlobStore, Error, MediaLedger, Result};

use super::{MediaStore, MediaStoreInner};
use crate::config::DEFAULT_TIMEOUT_SECS;

/// Default number of blob deletions run at once by batch deletes.
pub const DEFAULT_DELETE_CONCURRENCY: usize = 8;

/// Builder for [`MediaStore`].
///
/// ```rust,ignore
/// let store = MediaStore::builder()
///     .with_ledger(ledger)
///     .with_blob_store(blobs)
///     .with_timeout(Duration::from_secs(10))
///     .build()?;
/// ```
#[derive(Default)]
#[must_use = "builders do nothing unless built"]
pub struct MediaStoreBuilder {
    ledger: Option<Arc<dyn MediaLedger>>,
    blob_store: Option<Arc<dyn BlobStore>>,
    timeout: Option<Duration>,
    delete_concurrency: Option<usize>,
    health_check_interval: Option<Duration>,
}

impl MediaStoreBuilder {
    /// Sets the metadata ledger.
    pub fn with_ledger(mut self, ledger: Arc<dyn MediaLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Sets the blob store.
    pub fn with_blob_store(mut self, blob_store: Arc<dyn BlobStore>) -> Self {
        self.blob_store = Some(blob_store);
        self
    }

    /// Sets the deadline applied to every ledger and blob store call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets how many blob deletions a batch delete runs at once.
    pub fn with_delete_concurrency(mut self, concurrency: usize) -> Self {
        self.delete_concurrency = Some(concurrency);
        self
    }

    /// Enables the background health monitor at the given interval.
    pub fn with_health_check_interval(mut self, interval: Duration) -> Self {
        self.health_check_interval = Some(interval);
        self
    }

    /// Builds the store.
    ///
    /// # Errors
    ///
    /// Fails with [`ErrorKind::NilLedger`] when no ledger was supplied and
    /// with [`ErrorKind::Configuration`] for a missing blob store or a zero
    /// timeout, concurrency or interval.
    ///
    /// [`ErrorKind::NilLedger`]: vellum_core::ErrorKind::NilLedger
    /// [`ErrorKind::Configuration`]: vellum_core::ErrorKind::Configuration
    pub fn build(self) -> Result<MediaStore> {
        let ledger = self.ledger.ok_or_else(Error::nil_ledger)?;
        let blob_store = self.blob_store.ok_or_else(|| {
            Error::configuration().with_message("blob store cannot be empty")
        })?;

        let timeout = self
            .timeout
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        if timeout.is_zero() {
            return Err(Error::configuration().with_message("timeout must be greater than zero"));
        }

        let delete_concurrency = self
            .delete_concurrency
            .unwrap_or(DEFAULT_DELETE_CONCURRENCY);
        if delete_concurrency == 0 {
            return Err(
                Error::configuration().with_message("delete concurrency must be at least one")
            );
        }

        if self.health_check_interval.is_some_and(|i| i.is_zero()) {
            return Err(Error::configuration()
                .with_message("health check interval must be greater than zero"));
        }

        Ok(MediaStore {
            inner: Arc::new(MediaStoreInner {
                ledger,
                blob_store,
                timeout,
                delete_concurrency,
                health_check_interval: self.health_check_interval,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use vellum_core::ErrorKind;
    use vellum_core::mock::{MemoryBlobStore, MemoryLedger};

    use super::*;

    #[test]
    fn missing_ledger_is_nil_ledger() {
        let err = MediaStore::builder()
            .with_blob_store(Arc::new(MemoryBlobStore::new()))
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NilLedger);
    }

    #[test]
    fn missing_blob_store_is_configuration() {
        let err = MediaStore::builder()
            .with_ledger(Arc::new(MemoryLedger::new()))
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn zero_values_are_rejected() {
        let base = || {
            MediaStore::builder()
                .with_ledger(Arc::new(MemoryLedger::new()))
                .with_blob_store(Arc::new(MemoryBlobStore::new()))
        };

        assert!(base().with_timeout(Duration::ZERO).build().is_err());
        assert!(base().with_delete_concurrency(0).build().is_err());
        assert!(
            base()
                .with_health_check_interval(Duration::ZERO)
                .build()
                .is_err()
        );
    }

    #[test]
    fn defaults() {
        let store = MediaStore::builder()
            .with_ledger(Arc::new(MemoryLedger::new()))
            .with_blob_store(Arc::new(MemoryBlobStore::new()))
            .build()
            .expect("store");

        assert_eq!(store.timeout(), Duration::from_secs(30));
        assert_eq!(store.health_check_interval(), None);
    }
}
