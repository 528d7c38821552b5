//! Storage backend implementation.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use opendal::{Operator, services};
use vellum_core::{BlobStore, ObjectInfo, ObjectKey, PutObject, Result};

use crate::TRACING_TARGET;
use crate::config::{StorageConfig, StorageProvider};
use crate::error::{StorageError, StorageResult};

/// Blob store backed by an OpenDAL operator.
///
/// Every call is bounded by the configured deadline; expiry surfaces as
/// [`StorageError::Timeout`].
#[derive(Clone)]
pub struct StorageBackend {
    operator: Operator,
    config: StorageConfig,
    timeout: Duration,
}

impl StorageBackend {
    /// Creates a new storage backend from configuration.
    ///
    /// No network call is made; credentials and reachability are only
    /// exercised by the first operation.
    pub async fn new(config: StorageConfig) -> StorageResult<Self> {
        config.validate()?;
        let operator = Self::create_operator(&config)?;
        let timeout = config.timeout();

        tracing::info!(
            target: TRACING_TARGET,
            provider = %config.provider,
            bucket = %config.bucket,
            root = %config.root_path(),
            timeout_secs = timeout.as_secs(),
            "Storage backend initialized"
        );

        Ok(Self {
            operator,
            config,
            timeout,
        })
    }

    /// Overrides the per-call deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the configuration for this backend.
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Returns the storage provider.
    pub fn provider(&self) -> StorageProvider {
        self.config.provider
    }

    /// Returns the per-call deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Reads an object from storage.
    pub async fn read(&self, path: &str) -> StorageResult<Bytes> {
        tracing::debug!(target: TRACING_TARGET, path = %path, "Reading object");

        let data = self
            .bounded(async { self.operator.read(path).await })
            .await?
            .to_bytes();

        tracing::debug!(
            target: TRACING_TARGET,
            path = %path,
            size = data.len(),
            "Object read complete"
        );

        Ok(data)
    }

    /// Writes an object to storage, attaching user metadata when the
    /// provider supports it.
    pub async fn write(&self, path: &str, object: &PutObject) -> StorageResult<()> {
        tracing::debug!(
            target: TRACING_TARGET,
            path = %path,
            size = object.data.len(),
            "Writing object"
        );

        let capability = self.operator.info().full_capability();
        let metadata = if capability.write_with_user_metadata {
            object.metadata.clone()
        } else {
            if !object.metadata.is_empty() {
                tracing::debug!(
                    target: TRACING_TARGET,
                    path = %path,
                    provider = %self.config.provider,
                    "Provider does not store user metadata, dropping it"
                );
            }
            Default::default()
        };

        if !object.tags.is_empty() {
            tracing::debug!(
                target: TRACING_TARGET,
                path = %path,
                tags = object.tags.len(),
                "Object tags are not forwarded to the provider"
            );
        }

        let data = object.data.clone();
        self.bounded(async {
            if metadata.is_empty() {
                self.operator.write(path, data).await
            } else {
                self.operator
                    .write_with(path, data)
                    .user_metadata(metadata)
                    .await
            }
        })
        .await?;

        tracing::debug!(target: TRACING_TARGET, path = %path, "Object write complete");
        Ok(())
    }

    /// Returns the stored size of an object.
    pub async fn stat(&self, path: &str) -> StorageResult<u64> {
        let meta = self.bounded(async { self.operator.stat(path).await }).await?;
        Ok(meta.content_length())
    }

    /// Deletes an object, failing with [`StorageError::NotFound`] when it
    /// does not exist.
    pub async fn delete(&self, path: &str) -> StorageResult<()> {
        tracing::debug!(target: TRACING_TARGET, path = %path, "Deleting object");

        // OpenDAL treats deleting a missing path as success.
        self.stat(path).await?;
        self.bounded(async { self.operator.delete(path).await })
            .await?;

        tracing::debug!(target: TRACING_TARGET, path = %path, "Object deleted");
        Ok(())
    }

    async fn bounded<T, F>(&self, call: F) -> StorageResult<T>
    where
        F: Future<Output = opendal::Result<T>>,
    {
        bounded(self.timeout, call).await
    }

    /// Creates an OpenDAL operator based on configuration.
    #[allow(unreachable_patterns)]
    fn create_operator(config: &StorageConfig) -> StorageResult<Operator> {
        match config.provider {
            #[cfg(feature = "s3")]
            StorageProvider::Minio | StorageProvider::S3 => {
                let mut builder = services::S3::default()
                    .bucket(&config.bucket)
                    .root(&config.root_path())
                    .region(config.region())
                    .disable_config_load()
                    .disable_ec2_metadata();

                if let Some(ref endpoint) = config.endpoint_url() {
                    builder = builder.endpoint(endpoint);
                }

                match (&config.access_key_id, &config.secret_access_key) {
                    (Some(access_key_id), Some(secret_access_key)) => {
                        builder = builder
                            .access_key_id(access_key_id)
                            .secret_access_key(secret_access_key);
                    }
                    _ => builder = builder.allow_anonymous(),
                }

                Operator::new(builder)
                    .map(|op| op.finish())
                    .map_err(|e| StorageError::init(e.to_string()))
            }

            #[cfg(feature = "memory")]
            StorageProvider::Memory => {
                let builder = services::Memory::default().root(&config.root_path());

                Operator::new(builder)
                    .map(|op| op.finish())
                    .map_err(|e| StorageError::init(e.to_string()))
            }

            _ => Err(StorageError::UnsupportedProvider(config.provider.to_string())),
        }
    }
}

/// Runs `call`, giving up after `timeout`.
async fn bounded<T, F>(timeout: Duration, call: F) -> StorageResult<T>
where
    F: Future<Output = opendal::Result<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result.map_err(StorageError::from),
        Err(_) => {
            tracing::warn!(
                target: TRACING_TARGET,
                timeout_ms = timeout.as_millis(),
                "Storage call exceeded its deadline"
            );
            Err(StorageError::Timeout(timeout))
        }
    }
}

#[async_trait::async_trait]
impl BlobStore for StorageBackend {
    async fn put_object(&self, object: PutObject) -> Result<()> {
        object.check_declared_size()?;
        self.write(object.key.as_str(), &object).await?;
        Ok(())
    }

    async fn get_object(&self, key: &ObjectKey) -> Result<Bytes> {
        Ok(self.read(key.as_str()).await?)
    }

    async fn stat_object(&self, key: &ObjectKey) -> Result<ObjectInfo> {
        let size = self.stat(key.as_str()).await?;
        Ok(ObjectInfo { size })
    }

    async fn delete_object(&self, key: &ObjectKey) -> Result<()> {
        Ok(self.delete(key.as_str()).await?)
    }
}

impl std::fmt::Debug for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageBackend")
            .field("provider", &self.config.provider)
            .field("bucket", &self.config.bucket)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use std::collections::HashMap;

    use vellum_core::{ErrorKind, MediaId};

    use super::*;

    async fn backend() -> StorageBackend {
        StorageBackend::new(StorageConfig::memory("media"))
            .await
            .expect("memory backend")
    }

    fn key(id: i64) -> ObjectKey {
        ObjectKey::for_media(MediaId::new(id), None)
    }

    #[tokio::test]
    async fn put_stat_get_delete() -> Result<()> {
        let store = backend().await;
        let object = PutObject::new(key(1), &b"hello"[..]).with_size(5);

        store.put_object(object).await?;
        assert_eq!(store.stat_object(&key(1)).await?.size, 5);
        assert_eq!(store.get_object(&key(1)).await?, Bytes::from_static(b"hello"));

        store.delete_object(&key(1)).await?;
        let err = store.get_object(&key(1)).await.unwrap_err();
        assert!(err.is_not_found());
        Ok(())
    }

    #[tokio::test]
    async fn missing_objects_are_not_found() {
        let store = backend().await;
        assert!(store.stat_object(&key(9)).await.unwrap_err().is_not_found());
        assert!(store.delete_object(&key(9)).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn declared_size_mismatch_writes_nothing() {
        let store = backend().await;
        let object = PutObject::new(key(2), &b"abc"[..]).with_size(10);

        let err = store.put_object(object).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(store.stat_object(&key(2)).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn metadata_and_tags_do_not_block_writes() -> Result<()> {
        let store = backend().await;
        let object = PutObject::new(key(3), &b"x"[..])
            .with_metadata(HashMap::from([("owner".to_owned(), "ops".to_owned())]))
            .with_tags(HashMap::from([("tier".to_owned(), "hot".to_owned())]));

        store.put_object(object).await?;
        assert_eq!(store.stat_object(&key(3)).await?.size, 1);
        Ok(())
    }

    #[tokio::test]
    async fn probe_writes_an_empty_sentinel() -> Result<()> {
        let store = backend().await;
        store.probe(&ObjectKey::sentinel()).await?;
        assert_eq!(store.stat_object(&ObjectKey::sentinel()).await?.size, 0);
        Ok(())
    }

    #[tokio::test]
    async fn base_paths_nest_keys() -> Result<()> {
        let store = backend().await;
        let nested = ObjectKey::for_media(MediaId::new(4), Some("uploads/2025"));
        store.put_object(PutObject::new(nested.clone(), &b"n"[..])).await?;

        assert!(store.stat_object(&nested).await.is_ok());
        assert!(store.stat_object(&key(4)).await.unwrap_err().is_not_found());
        Ok(())
    }

    #[tokio::test]
    async fn slow_calls_time_out() {
        let timeout = Duration::from_millis(20);
        let err = bounded::<(), _>(timeout, std::future::pending())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Timeout(after) if after == timeout));

        let err = vellum_core::Error::from(err);
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.timeout);
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let err = StorageBackend::new(StorageConfig::memory(""))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Init(_)));
    }
}
