//! The metadata ledger seam.

use crate::{MediaId, MediaRecord, NewMedia, Result};

/// Durable, transactional record of media metadata.
///
/// Implementations must keep every multi-record operation all-or-nothing:
/// when one unit of work fails, nothing the call touched is persisted and no
/// record is reported back.
///
/// # Errors
///
/// Driver and commit failures surface as [`ErrorKind::Storage`]. Lookups
/// that miss surface as [`ErrorKind::NotFound`] carrying the id.
///
/// [`ErrorKind::Storage`]: crate::ErrorKind::Storage
/// [`ErrorKind::NotFound`]: crate::ErrorKind::NotFound
#[async_trait::async_trait]
pub trait MediaLedger: Send + Sync {
    /// Inserts one unverified record and returns it with its assigned id.
    async fn create_media(&self, media: NewMedia) -> Result<MediaRecord>;

    /// Inserts several records in one transaction, preserving input order.
    ///
    /// Empty input returns an empty vector without opening a transaction.
    async fn create_medias(&self, medias: Vec<NewMedia>) -> Result<Vec<MediaRecord>>;

    /// Looks up a record regardless of its verification state.
    async fn find_media(&self, id: MediaId) -> Result<Option<MediaRecord>>;

    /// Flags a record as verified and returns the updated row.
    async fn mark_media_verified(&self, id: MediaId) -> Result<MediaRecord>;

    /// Deletes several records in one transaction.
    ///
    /// Any missing id rolls back the whole batch.
    async fn delete_medias(&self, ids: &[MediaId]) -> Result<Vec<MediaRecord>>;

    /// Deletes a single record.
    async fn delete_media(&self, id: MediaId) -> Result<MediaRecord> {
        let mut deleted = self.delete_medias(&[id]).await?;
        deleted.pop().ok_or_else(|| crate::Error::not_found(id))
    }

    /// Checks that the ledger is reachable.
    async fn ping(&self) -> Result<()>;
}
