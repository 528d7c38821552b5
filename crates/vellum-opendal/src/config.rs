//! Storage configuration types.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use vellum_core::Error;

use crate::error::{StorageError, StorageResult};

/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Per-call deadline used when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Object storage provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, AsRefStr, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StorageProvider {
    /// Self-hosted MinIO over the S3 protocol.
    #[default]
    Minio,
    /// Amazon S3.
    S3,
    /// Process-local in-memory store.
    Memory,
}

impl StorageProvider {
    /// Returns whether support for this provider is compiled in.
    pub fn is_enabled(self) -> bool {
        match self {
            Self::Minio | Self::S3 => cfg!(feature = "s3"),
            Self::Memory => cfg!(feature = "memory"),
        }
    }
}

impl FromStr for StorageProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minio" => Ok(Self::Minio),
            "s3" => Ok(Self::S3),
            "memory" => Ok(Self::Memory),
            _ => Err(Error::unsupported_provider(s)),
        }
    }
}

/// Connection settings for a blob store bucket.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage provider.
    #[serde(default)]
    pub provider: StorageProvider,
    /// Bucket name.
    pub bucket: String,
    /// Endpoint as `host:port` or a full URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Whether to use TLS when the endpoint has no scheme.
    #[serde(default)]
    pub ssl_enabled: bool,
    /// Access key ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,
    /// Secret access key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,
    /// Region, `us-east-1` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Per-call deadline in seconds, 30 when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Key prefix inside the bucket.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
}

impl StorageConfig {
    /// Creates a configuration for `bucket` on the given provider.
    pub fn new(provider: StorageProvider, bucket: impl Into<String>) -> Self {
        Self {
            provider,
            bucket: bucket.into(),
            endpoint: None,
            ssl_enabled: false,
            access_key_id: None,
            secret_access_key: None,
            region: None,
            timeout_secs: None,
            root: None,
        }
    }

    /// Creates an in-memory configuration.
    pub fn memory(bucket: impl Into<String>) -> Self {
        Self::new(StorageProvider::Memory, bucket)
    }

    /// Sets the endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Enables or disables TLS.
    pub fn with_ssl(mut self, ssl_enabled: bool) -> Self {
        self.ssl_enabled = ssl_enabled;
        self
    }

    /// Sets static credentials.
    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.access_key_id = Some(access_key_id.into());
        self.secret_access_key = Some(secret_access_key.into());
        self
    }

    /// Sets the region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Sets the per-call deadline in seconds.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Sets the key prefix inside the bucket.
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Returns the configured region or the default one.
    pub fn region(&self) -> &str {
        self.region.as_deref().unwrap_or(DEFAULT_REGION)
    }

    /// Returns the configured per-call deadline or the default one.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Returns the endpoint as a URL, adding a scheme from `ssl_enabled`
    /// when the endpoint is a bare `host:port`.
    pub fn endpoint_url(&self) -> Option<String> {
        let endpoint = self.endpoint.as_deref()?;
        if endpoint.contains("://") {
            return Some(endpoint.to_owned());
        }

        let scheme = if self.ssl_enabled { "https" } else { "http" };
        Some(format!("{scheme}://{endpoint}"))
    }

    /// Returns the root as an absolute OpenDAL path.
    pub fn root_path(&self) -> String {
        match self.root.as_deref().map(|r| r.trim_matches('/')) {
            Some(root) if !root.is_empty() => format!("/{root}/"),
            _ => "/".to_owned(),
        }
    }

    /// Validates the configuration without touching the network.
    pub fn validate(&self) -> StorageResult<()> {
        if !self.provider.is_enabled() {
            return Err(StorageError::UnsupportedProvider(self.provider.to_string()));
        }

        if self.bucket.trim().is_empty() {
            return Err(StorageError::init("bucket name is required"));
        }

        if self.provider == StorageProvider::Minio && self.endpoint.is_none() {
            return Err(StorageError::init("minio requires an endpoint"));
        }

        if self.access_key_id.is_some() != self.secret_access_key.is_some() {
            return Err(StorageError::init(
                "access key id and secret access key must be set together",
            ));
        }

        if self.timeout_secs == Some(0) {
            return Err(StorageError::init("timeout must be at least one second"));
        }

        Ok(())
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
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
            .field("timeout", &self.timeout())
            .field("root", &self.root)
            .finish()
    }
}
