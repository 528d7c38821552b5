//! Media records and the payloads exchanged with the coordinator.

use std::collections::HashMap;
use std::io::Cursor;

use bytes::Bytes;
use derive_more::{Display, From, FromStr, Into};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Ledger-assigned identifier of a media item.
///
/// The decimal form is also the blob key (see [`ObjectKey`]).
///
/// [`ObjectKey`]: crate::ObjectKey
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Serialize, Deserialize, Display, From, Into, FromStr)]
#[serde(transparent)]
pub struct MediaId(i64);

impl MediaId {
    /// Wraps a raw ledger identifier.
    #[inline]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw ledger identifier.
    #[inline]
    pub const fn get(self) -> i64 {
        self.0
    }
}

/// A row of the media ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRecord {
    /// Unique, immutable identifier assigned on insert.
    pub id: MediaId,
    /// Insert time.
    pub created_at: Timestamp,
    /// Original filename supplied by the caller.
    pub filename: String,
    /// Content length in bytes.
    pub size: u64,
    /// Optional storage path override; prefixes the object key.
    pub base_path: Option<String>,
    /// Whether the blob write has been confirmed.
    pub verified: bool,
}

impl MediaRecord {
    /// Returns whether the record is still waiting for (or lost) its blob.
    #[inline]
    pub fn is_orphan_candidate(&self) -> bool {
        !self.verified
    }
}

/// Data for inserting a new media record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMedia {
    /// Original filename.
    pub filename: String,
    /// Content length in bytes.
    pub size: u64,
    /// Optional storage path override.
    pub base_path: Option<String>,
}

impl NewMedia {
    /// Creates an insert payload without a base path.
    pub fn new(filename: impl Into<String>, size: u64) -> Self {
        Self {
            filename: filename.into(),
            size,
            base_path: None,
        }
    }

    /// Sets the storage base path.
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }
}

/// Caller-supplied description of an upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaMeta {
    /// Name stored as the record's filename.
    pub name: String,
    /// User metadata forwarded to the blob store.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Object tags forwarded to the blob store when it supports tagging.
    #[serde(default)]
    pub tags: HashMap<String, String>,
    /// Optional storage path override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,
}

impl MediaMeta {
    /// Creates metadata carrying only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Adds a user metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Adds an object tag.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Sets the storage base path.
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }
}

/// A fetched media item.
#[derive(Debug, Clone)]
pub struct Media {
    /// Item name (the record's filename).
    pub name: String,
    /// Fully buffered content.
    pub content: Bytes,
    /// The ledger record the content was resolved through.
    pub record: MediaRecord,
}

impl Media {
    /// Returns the content length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Returns whether the content is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Converts the content into an [`AsyncRead`] reader.
    ///
    /// [`AsyncRead`]: tokio::io::AsyncRead
    pub fn into_reader(self) -> Cursor<Bytes> {
        Cursor::new(self.content)
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;

    #[test]
    fn media_id_parses_and_displays_decimal() {
        let id: MediaId = "1234".parse().expect("decimal id");
        assert_eq!(id, MediaId::new(1234));
        assert_eq!(id.to_string(), "1234");
        assert!("abc".parse::<MediaId>().is_err());
    }

    #[test]
    fn media_id_serializes_transparently() {
        let json = serde_json::to_string(&MediaId::new(7)).expect("serialize");
        assert_eq!(json, "7");
    }

    #[test]
    fn meta_builders() {
        let meta = MediaMeta::new("hello.txt")
            .with_metadata("owner", "alice")
            .with_tag("kind", "text")
            .with_base_path("uploads");
        assert_eq!(meta.name, "hello.txt");
        assert_eq!(meta.metadata.get("owner").map(String::as_str), Some("alice"));
        assert_eq!(meta.tags.get("kind").map(String::as_str), Some("text"));
        assert_eq!(meta.base_path.as_deref(), Some("uploads"));
    }

    #[tokio::test]
    async fn media_reader_yields_content() {
        let media = Media {
            name: "hello.txt".into(),
            content: Bytes::from_static(b"Hello, MinIO!"),
            record: MediaRecord {
                id: MediaId::new(1),
                created_at: Timestamp::now(),
                filename: "hello.txt".into(),
                size: 13,
                base_path: None,
                verified: true,
            },
        };

        let mut out = String::new();
        media
            .into_reader()
            .read_to_string(&mut out)
            .await
            .expect("read");
        assert_eq!(out, "Hello, MinIO!");
    }
}
