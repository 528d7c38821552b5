//! Object keys and blob store payloads.

use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{Error, MediaId, MediaRecord, Result};

/// Key prefix reserved for objects that are not media (health probes).
pub const RESERVED_NAMESPACE: &str = ".vellum";

/// Name of the health probe object inside the reserved namespace.
const SENTINEL_NAME: &str = "healthcheck";

/// Key of an object in the blob store.
///
/// Media objects are keyed by the decimal record id, optionally under the
/// record's base path. The reserved namespace is never produced for media.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Returns the key of a media object.
    pub fn for_media(id: MediaId, base_path: Option<&str>) -> Self {
        match base_path.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
            Some(prefix) => Self(format!("{prefix}/{id}")),
            None => Self(id.to_string()),
        }
    }

    /// Returns the key of the object owned by `record`.
    pub fn for_record(record: &MediaRecord) -> Self {
        Self::for_media(record.id, record.base_path.as_deref())
    }

    /// Returns the reserved health probe key.
    pub fn sentinel() -> Self {
        Self(format!("{RESERVED_NAMESPACE}/{SENTINEL_NAME}"))
    }

    /// Returns whether this key lives in the reserved namespace.
    pub fn is_reserved(&self) -> bool {
        Self::in_reserved_namespace(&self.0)
    }

    /// Returns the key as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Checks that a caller-supplied base path cannot produce reserved keys.
    pub fn validate_base_path(base_path: &str) -> Result<()> {
        let trimmed = base_path.trim_matches('/');
        if Self::in_reserved_namespace(trimmed) {
            return Err(Error::invalid_input().with_message(format!(
                "base path `{base_path}` is inside the reserved `{RESERVED_NAMESPACE}` namespace"
            )));
        }
        if trimmed.split('/').any(|segment| segment == "..") {
            return Err(Error::invalid_input()
                .with_message(format!("base path `{base_path}` must not contain `..`")));
        }
        Ok(())
    }

    fn in_reserved_namespace(key: &str) -> bool {
        key == RESERVED_NAMESPACE
            || key
                .strip_prefix(RESERVED_NAMESPACE)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A blob write request.
#[derive(Debug, Clone)]
pub struct PutObject {
    /// Destination key.
    pub key: ObjectKey,
    /// Fully buffered content.
    pub data: Bytes,
    /// Declared content length; `None` means unknown.
    pub size: Option<u64>,
    /// User metadata.
    pub metadata: HashMap<String, String>,
    /// Object tags.
    pub tags: HashMap<String, String>,
}

impl PutObject {
    /// Creates a write request with no declared size and no metadata.
    pub fn new(key: ObjectKey, data: impl Into<Bytes>) -> Self {
        Self {
            key,
            data: data.into(),
            size: None,
            metadata: HashMap::new(),
            tags: HashMap::new(),
        }
    }

    /// Declares the expected content length.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Sets the user metadata.
    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Sets the object tags.
    pub fn with_tags(mut self, tags: HashMap<String, String>) -> Self {
        self.tags = tags;
        self
    }

    /// Rejects the request when the declared size differs from the payload.
    pub fn check_declared_size(&self) -> Result<()> {
        match self.size {
            Some(declared) if declared != self.data.len() as u64 => {
                Err(Error::transport().with_message(format!(
                    "declared size {declared} does not match payload of {} bytes for `{}`",
                    self.data.len(),
                    self.key
                )))
            }
            _ => Ok(()),
        }
    }
}

/// What the blob store reports about a stored object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Content length in bytes.
    pub size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_key_is_decimal_id() {
        assert_eq!(ObjectKey::for_media(MediaId::new(17), None).as_str(), "17");
        assert_eq!(
            ObjectKey::for_media(MediaId::new(17), Some("/uploads/2025/")).as_str(),
            "uploads/2025/17"
        );
        assert_eq!(ObjectKey::for_media(MediaId::new(17), Some("/")).as_str(), "17");
    }

    #[test]
    fn sentinel_is_reserved_and_media_is_not() {
        assert!(ObjectKey::sentinel().is_reserved());
        assert!(!ObjectKey::for_media(MediaId::new(1), None).is_reserved());
        assert!(!ObjectKey::for_media(MediaId::new(1), Some(".vellumx")).is_reserved());
    }

    #[test]
    fn reserved_base_paths_are_rejected() {
        assert!(ObjectKey::validate_base_path(".vellum").is_err());
        assert!(ObjectKey::validate_base_path("/.vellum/x").is_err());
        assert!(ObjectKey::validate_base_path("a/../b").is_err());
        assert!(ObjectKey::validate_base_path("uploads/.vellum").is_ok());
        assert!(ObjectKey::validate_base_path(".vellumx").is_ok());
    }

    #[test]
    fn declared_size_mismatch_is_rejected() {
        let key = ObjectKey::for_media(MediaId::new(3), None);
        let ok = PutObject::new(key.clone(), &b"abc"[..]).with_size(3);
        assert!(ok.check_declared_size().is_ok());

        let bad = PutObject::new(key.clone(), &b"abc"[..]).with_size(4);
        let err = bad.check_declared_size().unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Transport);

        let streaming = PutObject::new(key, &b"abc"[..]);
        assert!(streaming.check_declared_size().is_ok());
    }
}
