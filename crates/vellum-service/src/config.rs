//! Media store configuration.

use std::fmt;
use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use vellum_core::{Error, Result};
use vellum_opendal::{StorageConfig, StorageProvider};

/// Default per-call deadline in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = vellum_opendal::DEFAULT_TIMEOUT_SECS;

const MIN_TIMEOUT_SECS: u64 = 1;
const MAX_TIMEOUT_SECS: u64 = 300;

const MIN_HEALTH_CHECK_INTERVAL_SECS: u64 = 1;

/// Configuration for [`MediaStore::connect`].
///
/// Ledger pool tuning is not part of this struct; it lives in the ledger
/// crate's own configuration.
///
/// ## Example
///
/// ```rust
/// use vellum_service::MediaStoreConfig;
///
/// let config = MediaStoreConfig::builder()
///     .with_bucket("media")
///     .with_endpoint("localhost:9000")
///     .with_credentials("minioadmin", "minioadmin")
///     .build()
///     .expect("valid configuration");
///
/// assert_eq!(config.region(), "us-east-1");
/// ```
///
/// [`MediaStore::connect`]: crate::MediaStore::connect
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[builder(
    name = "MediaStoreConfigBuilder",
    pattern = "owned",
    setter(into, strip_option, prefix = "with"),
    build_fn(validate = "Self::validate_config")
)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct MediaStoreConfig {
    /// Blob store provider (minio, s3, memory)
    #[cfg_attr(
        feature = "config",
        arg(long = "media-provider", env = "VELLUM_PROVIDER", default_value = "minio")
    )]
    #[builder(default)]
    #[serde(default)]
    pub provider: StorageProvider,

    /// Bucket holding media objects
    #[cfg_attr(feature = "config", arg(long = "media-bucket", env = "VELLUM_BUCKET"))]
    pub bucket: String,

    /// Blob store endpoint, `host:port` or a full URL
    #[cfg_attr(
        feature = "config",
        arg(long = "media-endpoint", env = "VELLUM_ENDPOINT")
    )]
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Use TLS when the endpoint has no scheme
    #[cfg_attr(
        feature = "config",
        arg(long = "media-ssl-enabled", env = "VELLUM_SSL_ENABLED")
    )]
    #[builder(default)]
    #[serde(default)]
    pub ssl_enabled: bool,

    /// Access key ID
    #[cfg_attr(
        feature = "config",
        arg(long = "media-access-key-id", env = "VELLUM_ACCESS_KEY_ID")
    )]
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,

    /// Secret access key
    #[cfg_attr(
        feature = "config",
        arg(
            long = "media-secret-access-key",
            env = "VELLUM_SECRET_ACCESS_KEY",
            hide_env_values = true
        )
    )]
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,

    /// Region, `us-east-1` when unset
    #[cfg_attr(feature = "config", arg(long = "media-region", env = "VELLUM_REGION"))]
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Per-call deadline for ledger and blob store calls in seconds (1-300)
    #[cfg_attr(
        feature = "config",
        arg(
            long = "media-timeout-secs",
            env = "VELLUM_TIMEOUT_SECS",
            default_value_t = DEFAULT_TIMEOUT_SECS
        )
    )]
    #[builder(default = "DEFAULT_TIMEOUT_SECS")]
    #[serde(default = "MediaStoreConfig::default_timeout_secs")]
    pub timeout_secs: u64,

    /// Interval between background health probes in seconds (disabled when unset)
    #[cfg_attr(
        feature = "config",
        arg(
            long = "media-health-check-interval-secs",
            env = "VELLUM_HEALTH_CHECK_INTERVAL_SECS"
        )
    )]
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check_interval_secs: Option<u64>,

    /// Key prefix inside the bucket
    #[cfg_attr(feature = "config", arg(long = "media-root", env = "VELLUM_ROOT"))]
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
}

impl MediaStoreConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> MediaStoreConfigBuilder {
        MediaStoreConfigBuilder::default()
    }

    /// Creates an in-memory configuration, for tests and local runs.
    pub fn memory(bucket: impl Into<String>) -> Self {
        Self {
            provider: StorageProvider::Memory,
            bucket: bucket.into(),
            endpoint: None,
            ssl_enabled: false,
            access_key_id: None,
            secret_access_key: None,
            region: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            health_check_interval_secs: None,
            root: None,
        }
    }

    fn default_timeout_secs() -> u64 {
        DEFAULT_TIMEOUT_SECS
    }

    /// Returns the configured region or `us-east-1`.
    pub fn region(&self) -> &str {
        self.region
            .as_deref()
            .unwrap_or(vellum_opendal::DEFAULT_REGION)
    }

    /// Returns the per-call deadline.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns the background health probe interval, if enabled.
    pub fn health_check_interval(&self) -> Option<Duration> {
        self.health_check_interval_secs.map(Duration::from_secs)
    }

    /// Validates values that clap and serde cannot check on their own.
    pub fn validate(&self) -> Result<()> {
        check_values(
            &self.bucket,
            self.timeout_secs,
            self.health_check_interval_secs,
        )
        .map_err(|msg| Error::configuration().with_message(msg))
    }

    /// Returns the blob store settings derived from this configuration.
    pub fn storage_config(&self) -> StorageConfig {
        let mut storage = StorageConfig::new(self.provider, self.bucket.clone())
            .with_ssl(self.ssl_enabled)
            .with_timeout_secs(self.timeout_secs);

        storage.endpoint = self.endpoint.clone();
        storage.access_key_id = self.access_key_id.clone();
        storage.secret_access_key = self.secret_access_key.clone();
        storage.region = self.region.clone();
        storage.root = self.root.clone();
        storage
    }
}

impl MediaStoreConfigBuilder {
    /// Sets static credentials for the blob store.
    pub fn with_credentials(
        self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.with_access_key_id(access_key_id)
            .with_secret_access_key(secret_access_key)
    }

    fn validate_config(&self) -> std::result::Result<(), String> {
        let bucket = self.bucket.as_deref().unwrap_or_default();
        let timeout_secs = self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        let interval = self.health_check_interval_secs.flatten();
        check_values(bucket, timeout_secs, interval)
    }
}

fn check_values(
    bucket: &str,
    timeout_secs: u64,
    health_check_interval_secs: Option<u64>,
) -> std::result::Result<(), String> {
    if bucket.trim().is_empty() {
        return Err("bucket name is required".to_owned());
    }

    if !(MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS).contains(&timeout_secs) {
        return Err(format!(
            "timeout must be between {MIN_TIMEOUT_SECS} and {MAX_TIMEOUT_SECS} seconds, got {timeout_secs}"
        ));
    }

    if let Some(interval) = health_check_interval_secs
        && interval < MIN_HEALTH_CHECK_INTERVAL_SECS
    {
        return Err(format!(
            "health check interval must be at least {MIN_HEALTH_CHECK_INTERVAL_SECS} second"
        ));
    }

    Ok(())
}

impl fmt::Debug for MediaStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaStoreConfig")
            .field("provider", &self.provider)
            .field("bucket", &self.bucket)
            .field("endpoint", &self.endpoint)
            .field("ssl_enabled", &self.ssl_enabled)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "***"),
            )
            .field("region", &self.region())
            .field("timeout_secs", &self.timeout_secs)
            .field("health_check_interval_secs", &self.health_check_interval_secs)
            .field("root", &self.root)
            .finish()
    }
}

impl From<MediaStoreConfigBuilderError> for Error {
    fn from(err: MediaStoreConfigBuilderError) -> Self {
        Error::configuration().with_message(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use vellum_core::ErrorKind;

    use super::*;

    #[test]
    fn builder_applies_defaults() {
        let config = MediaStoreConfig::builder()
            .with_bucket("media")
            .build()
            .expect("valid config");

        assert_eq!(config.provider, StorageProvider::Minio);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.region(), "us-east-1");
        assert!(!config.ssl_enabled);
        assert!(config.health_check_interval().is_none());
    }

    #[test]
    fn builder_requires_bucket() {
        let err = MediaStoreConfig::builder().build().unwrap_err();
        assert_eq!(Error::from(err).kind(), ErrorKind::Configuration);

        let err = MediaStoreConfig::builder()
            .with_bucket("  ")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("bucket"));
    }

    #[test]
    fn builder_checks_ranges() {
        assert!(
            MediaStoreConfig::builder()
                .with_bucket("media")
                .with_timeout_secs(0u64)
                .build()
                .is_err()
        );
        assert!(
            MediaStoreConfig::builder()
                .with_bucket("media")
                .with_timeout_secs(301u64)
                .build()
                .is_err()
        );
        assert!(
            MediaStoreConfig::builder()
                .with_bucket("media")
                .with_health_check_interval_secs(0u64)
                .build()
                .is_err()
        );
    }

    #[test]
    fn validate_matches_builder() {
        let mut config = MediaStoreConfig::memory("media");
        assert!(config.validate().is_ok());

        config.timeout_secs = 0;
        assert_eq!(
            config.validate().unwrap_err().kind(),
            ErrorKind::Configuration
        );
    }

    #[test]
    fn storage_config_carries_every_field() {
        let config = MediaStoreConfig::builder()
            .with_provider(StorageProvider::S3)
            .with_bucket("media")
            .with_endpoint("s3.local:9000")
            .with_ssl_enabled(true)
            .with_credentials("key", "secret")
            .with_region("eu-west-1")
            .with_timeout_secs(5u64)
            .with_root("tenant")
            .build()
            .expect("valid config");

        let storage = config.storage_config();
        assert_eq!(storage.provider, StorageProvider::S3);
        assert_eq!(storage.endpoint_url().as_deref(), Some("https://s3.local:9000"));
        assert_eq!(storage.access_key_id.as_deref(), Some("key"));
        assert_eq!(storage.secret_access_key.as_deref(), Some("secret"));
        assert_eq!(storage.region(), "eu-west-1");
        assert_eq!(storage.timeout(), Duration::from_secs(5));
        assert_eq!(storage.root_path(), "/tenant/");
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: MediaStoreConfig =
            serde_json::from_str(r#"{ "bucket": "media", "provider": "memory" }"#)
                .expect("deserialize");

        assert_eq!(config.provider, StorageProvider::Memory);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_provider_is_unsupported() {
        let err = "ftp".parse::<StorageProvider>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedProvider);
    }
}
