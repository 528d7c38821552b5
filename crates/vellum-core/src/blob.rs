//! The blob store seam.

use bytes::Bytes;

use crate::{ObjectInfo, ObjectKey, PutObject, Result};

/// Object storage holding media content keyed by [`ObjectKey`].
///
/// Every call is expected to be bounded by a deadline; expiry is reported as
/// a transport error with the timeout flag set.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// Writes an object. A partial write is never considered committed.
    async fn put_object(&self, object: PutObject) -> Result<()>;

    /// Reads an object fully into memory.
    async fn get_object(&self, key: &ObjectKey) -> Result<Bytes>;

    /// Returns what the store knows about an object.
    async fn stat_object(&self, key: &ObjectKey) -> Result<ObjectInfo>;

    /// Removes an object, failing with not found when it does not exist.
    async fn delete_object(&self, key: &ObjectKey) -> Result<()>;

    /// Writes a zero-byte object to check the store accepts writes.
    async fn probe(&self, key: &ObjectKey) -> Result<()> {
        self.put_object(PutObject::new(key.clone(), Bytes::new()).with_size(0))
            .await
    }
}
