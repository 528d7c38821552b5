//! The media coordinator.
//!
//! [`MediaStore`] keeps the metadata ledger and the blob store consistent
//! without a distributed transaction. Writes go ledger first and are only
//! reported as successful once the blob is confirmed and the record flagged
//! verified; deletes go blob first so a row never points at content that was
//! removed behind its back.
//!
//! Records left unverified by a failed save are not cleaned up here. They
//! are logged with their id and left for external reconciliation.

mod builder;
mod media;

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub use builder::{DEFAULT_DELETE_CONCURRENCY, MediaStoreBuilder};
use vellum_core::{BlobStore, Error, HealthReport, MediaLedger, ObjectKey, Result};
use vellum_opendal::StorageBackend;

use crate::config::MediaStoreConfig;
use crate::health::{HealthMonitor, HealthMonitorHandle};
use crate::{TRACING_TARGET_HEALTH, TRACING_TARGET_STORE};

/// Coordinates media writes, reads and deletes across a ledger and a blob
/// store.
///
/// Cheap to clone; clones share the same ledger and blob store.
#[derive(Clone)]
pub struct MediaStore {
    inner: Arc<MediaStoreInner>,
}

struct MediaStoreInner {
    ledger: Arc<dyn MediaLedger>,
    blob_store: Arc<dyn BlobStore>,
    timeout: Duration,
    delete_concurrency: usize,
    health_check_interval: Option<Duration>,
}

impl MediaStore {
    /// Returns a builder for assembling a store from its parts.
    pub fn builder() -> MediaStoreBuilder {
        MediaStoreBuilder::default()
    }

    /// Creates a store over an OpenDAL backend described by `config`.
    ///
    /// No network call is made; an unreachable blob store is only noticed
    /// by the first operation or health check.
    ///
    /// # Errors
    ///
    /// Fails with a configuration error for invalid settings and with an
    /// unsupported provider error when the provider is not compiled in.
    pub async fn connect(config: &MediaStoreConfig, ledger: Arc<dyn MediaLedger>) -> Result<Self> {
        config.validate()?;
        let backend = StorageBackend::new(config.storage_config()).await?;

        tracing::info!(
            target: TRACING_TARGET_STORE,
            provider = %config.provider,
            bucket = %config.bucket,
            timeout_secs = config.timeout_secs,
            "Media store connected"
        );

        let mut builder = Self::builder()
            .with_ledger(ledger)
            .with_blob_store(Arc::new(backend))
            .with_timeout(config.timeout());
        if let Some(interval) = config.health_check_interval() {
            builder = builder.with_health_check_interval(interval);
        }

        builder.build()
    }

    /// Returns the metadata ledger.
    pub fn ledger(&self) -> &Arc<dyn MediaLedger> {
        &self.inner.ledger
    }

    /// Returns the blob store.
    pub fn blob_store(&self) -> &Arc<dyn BlobStore> {
        &self.inner.blob_store
    }

    /// Returns the per-call deadline.
    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// Returns the configured background health probe interval.
    pub fn health_check_interval(&self) -> Option<Duration> {
        self.inner.health_check_interval
    }

    /// Probes the blob store by writing an empty object to the reserved
    /// sentinel key.
    ///
    /// Media objects and ledger records are never touched.
    pub async fn health_check(&self) -> Result<HealthReport> {
        let start = Instant::now();
        let sentinel = ObjectKey::sentinel();

        self.blob_call("health_check", self.blob_store().probe(&sentinel))
            .await?;

        let latency = start.elapsed();
        tracing::debug!(
            target: TRACING_TARGET_HEALTH,
            key = %sentinel,
            elapsed_ms = latency.as_millis(),
            "Blob store probe succeeded"
        );

        Ok(HealthReport::healthy().with_latency(latency))
    }

    /// Starts the background health monitor when an interval is configured.
    pub fn spawn_health_monitor(&self) -> Option<HealthMonitorHandle> {
        let interval = self.health_check_interval()?;
        Some(HealthMonitor::new(self.clone(), interval).spawn())
    }

    /// Runs a ledger call under the per-call deadline.
    async fn ledger_call<T>(
        &self,
        phase: &'static str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.timeout(), call).await {
            Ok(result) => result.map_err(|err| err.in_phase(phase)),
            Err(_) => Err(Error::storage()
                .with_timeout(self.timeout())
                .in_phase(phase)),
        }
    }

    /// Runs a blob store call under the per-call deadline.
    async fn blob_call<T>(
        &self,
        phase: &'static str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.timeout(), call).await {
            Ok(result) => result.map_err(|err| err.in_phase(phase)),
            Err(_) => Err(Error::transport()
                .with_timeout(self.timeout())
                .in_phase(phase)),
        }
    }
}

impl std::fmt::Debug for MediaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaStore")
            .field("timeout", &self.inner.timeout)
            .field("delete_concurrency", &self.inner.delete_concurrency)
            .field("health_check_interval", &self.inner.health_check_interval)
            .finish_non_exhaustive()
    }
}
