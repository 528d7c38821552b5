use std::collections::HashSet;

use bytes::Bytes;
use futures::{StreamExt, TryStreamExt, stream};
use tokio::io::{AsyncRead, AsyncReadExt};
use vellum_core::{
    Error, Media, MediaId, MediaMeta, MediaRecord, NewMedia, ObjectKey, PutObject, Result,
};

use super::MediaStore;
use crate::TRACING_TARGET_STORE;

impl MediaStore {
    /// Stores a media item and returns its verified record.
    ///
    /// The reader is buffered fully before anything is written. The record
    /// is inserted unverified, the blob is written under the record's key and
    /// confirmed by its stored length, and only then is the record flagged
    /// verified.
    ///
    /// # Errors
    ///
    /// A failure after the insert leaves the record unverified in the ledger;
    /// the error carries the record id and the failing phase (`put_blob`,
    /// `confirm_blob` or `mark_verified`).
    #[tracing::instrument(
        skip(self, reader, meta),
        fields(name = %meta.name),
        target = TRACING_TARGET_STORE
    )]
    pub async fn save_media<R>(&self, mut reader: R, meta: MediaMeta) -> Result<MediaRecord>
    where
        R: AsyncRead + Unpin + Send,
    {
        if let Some(base_path) = meta.base_path.as_deref() {
            ObjectKey::validate_base_path(base_path).map_err(|err| err.in_phase("read_input"))?;
        }

        let mut buffer = Vec::new();
        reader
            .read_to_end(&mut buffer)
            .await
            .map_err(|err| Error::from(err).in_phase("read_input"))?;
        let data = Bytes::from(buffer);
        let size = data.len() as u64;

        let mut new_media = NewMedia::new(meta.name, size);
        new_media.base_path = meta.base_path;

        let record = self
            .ledger_call("insert_record", self.ledger().create_media(new_media))
            .await?;
        let id = record.id;
        let key = ObjectKey::for_record(&record);

        let object = PutObject::new(key.clone(), data)
            .with_size(size)
            .with_metadata(meta.metadata)
            .with_tags(meta.tags);

        if let Err(err) = self
            .blob_call("put_blob", self.blob_store().put_object(object))
            .await
        {
            tracing::warn!(
                target: TRACING_TARGET_STORE,
                media_id = %id,
                key = %key,
                error = %err,
                "Blob write failed, record left unverified"
            );
            return Err(err.with_media_id(id));
        }

        let info = self
            .blob_call("confirm_blob", self.blob_store().stat_object(&key))
            .await
            .map_err(|err| err.with_media_id(id))?;
        if info.size != size {
            tracing::warn!(
                target: TRACING_TARGET_STORE,
                media_id = %id,
                key = %key,
                expected = size,
                stored = info.size,
                "Stored blob length differs, record left unverified"
            );
            return Err(Error::transport()
                .with_media_id(id)
                .with_message(format!(
                    "stored {} bytes under `{key}`, expected {size}",
                    info.size
                ))
                .in_phase("confirm_blob"));
        }

        let record = self
            .ledger_call("mark_verified", self.ledger().mark_media_verified(id))
            .await
            .map_err(|err| {
                tracing::warn!(
                    target: TRACING_TARGET_STORE,
                    media_id = %id,
                    key = %key,
                    error = %err,
                    "Blob stored but record could not be verified"
                );
                err.with_media_id(id)
            })?;

        tracing::info!(
            target: TRACING_TARGET_STORE,
            media_id = %id,
            key = %key,
            size,
            "Media saved"
        );

        Ok(record)
    }

    /// Fetches a media item by id.
    ///
    /// Unverified records are readable; their blob may be missing, in which
    /// case the call fails with not found.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_STORE)]
    pub async fn get_media(&self, id: MediaId) -> Result<Media> {
        let record = self.resolve(id).await?;
        let key = ObjectKey::for_record(&record);

        let content = self
            .blob_call("get_blob", self.blob_store().get_object(&key))
            .await
            .map_err(|err| {
                if err.is_not_found() {
                    Error::not_found(id).in_phase("get_blob")
                } else {
                    err.with_media_id(id)
                }
            })?;

        tracing::debug!(
            target: TRACING_TARGET_STORE,
            media_id = %id,
            size = content.len(),
            verified = record.verified,
            "Media fetched"
        );

        Ok(Media {
            name: record.filename.clone(),
            content,
            record,
        })
    }

    /// Deletes a media item, blob first.
    ///
    /// The blob is checked before it is deleted; one that is already gone
    /// counts as removed and is not deleted again, so a delete that failed
    /// after its blob phase can simply be retried. Any other blob failure
    /// leaves the ledger row in place.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_STORE)]
    pub async fn delete_media(&self, id: MediaId) -> Result<()> {
        let record = self.resolve(id).await?;
        self.delete_blob(&record).await?;

        self.ledger_call("delete_record", self.ledger().delete_media(id))
            .await
            .map_err(|err| err.with_media_id(id))?;

        tracing::info!(target: TRACING_TARGET_STORE, media_id = %id, "Media deleted");
        Ok(())
    }

    /// Deletes several media items and returns their records.
    ///
    /// Every id is resolved before any blob is touched, so an unknown id
    /// aborts the whole call. Blobs are deleted concurrently; the rows are
    /// then removed in one all-or-nothing ledger call. Duplicate ids are
    /// deleted once.
    #[tracing::instrument(skip(self, ids), fields(count = ids.len()), target = TRACING_TARGET_STORE)]
    pub async fn delete_medias(&self, ids: &[MediaId]) -> Result<Vec<MediaRecord>> {
        let mut seen = HashSet::with_capacity(ids.len());
        let ids: Vec<MediaId> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut records = Vec::with_capacity(ids.len());
        for id in &ids {
            records.push(self.resolve(*id).await?);
        }

        stream::iter(&records)
            .map(|record| self.delete_blob(record))
            .buffer_unordered(self.inner.delete_concurrency)
            .try_collect::<Vec<()>>()
            .await?;

        let deleted = self
            .ledger_call("delete_records", self.ledger().delete_medias(&ids))
            .await?;

        tracing::info!(
            target: TRACING_TARGET_STORE,
            count = deleted.len(),
            "Media batch deleted"
        );

        Ok(deleted)
    }

    /// Looks up a record, failing with not found when it does not exist.
    async fn resolve(&self, id: MediaId) -> Result<MediaRecord> {
        self.ledger_call("find_record", self.ledger().find_media(id))
            .await
            .map_err(|err| err.with_media_id(id))?
            .ok_or_else(|| Error::not_found(id).in_phase("find_record"))
    }

    async fn delete_blob(&self, record: &MediaRecord) -> Result<()> {
        let key = ObjectKey::for_record(record);
        let present = self
            .blob_call("delete_blob", self.blob_store().stat_object(&key))
            .await;
        let deleted = match present {
            Ok(_) => {
                self.blob_call("delete_blob", self.blob_store().delete_object(&key))
                    .await
            }
            Err(err) => Err(err),
        };

        match deleted {
            Ok(()) => Ok(()),
            Err(err) if err.is_not_found() => {
                tracing::debug!(
                    target: TRACING_TARGET_STORE,
                    media_id = %record.id,
                    key = %key,
                    "Blob already absent"
                );
                Ok(())
            }
            Err(err) => Err(err.with_media_id(record.id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::task::{Context, Poll};

    use tokio::io::ReadBuf;
    use vellum_core::ErrorKind;
    use vellum_core::mock::{BlobOp, LedgerOp, MemoryBlobStore, MemoryLedger};
    use vellum_opendal::{StorageBackend, StorageConfig};

    use super::*;

    struct Fixture {
        ledger: Arc<MemoryLedger>,
        blobs: Arc<MemoryBlobStore>,
        store: MediaStore,
    }

    fn fixture() -> Fixture {
        let ledger = Arc::new(MemoryLedger::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let store = MediaStore::builder()
            .with_ledger(ledger.clone())
            .with_blob_store(blobs.clone())
            .build()
            .expect("store");

        Fixture {
            ledger,
            blobs,
            store,
        }
    }

    struct BrokenReader;

    impl AsyncRead for BrokenReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionReset, "peer gone")))
        }
    }

    #[tokio::test]
    async fn save_get_delete_round_trip() -> Result<()> {
        let f = fixture();
        let meta = MediaMeta::new("notes.txt").with_metadata("owner", "ops");

        let record = f.store.save_media(&b"some notes"[..], meta).await?;
        assert!(record.verified);
        assert_eq!(record.size, 10);
        assert_eq!(record.filename, "notes.txt");

        let media = f.store.get_media(record.id).await?;
        assert_eq!(media.name, "notes.txt");
        assert_eq!(media.content, Bytes::from_static(b"some notes"));

        let stored = f
            .blobs
            .object(&ObjectKey::for_record(&record))
            .expect("blob");
        assert_eq!(stored.metadata.get("owner").map(String::as_str), Some("ops"));

        f.store.delete_media(record.id).await?;
        assert!(f.ledger.is_empty());
        assert!(f.blobs.keys().is_empty());

        let err = f.store.get_media(record.id).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.media_id, Some(record.id));
        Ok(())
    }

    #[tokio::test]
    async fn saved_records_are_verified_with_matching_blobs() -> Result<()> {
        let f = fixture();
        for name in ["a", "b", "c"] {
            let record = f
                .store
                .save_media(name.repeat(4).as_bytes(), MediaMeta::new(name))
                .await?;
            let stored = f.ledger.record(record.id).expect("record");
            let blob = f.blobs.object(&ObjectKey::for_record(&stored)).expect("blob");

            assert!(stored.verified);
            assert_eq!(blob.data.len() as u64, stored.size);
        }
        Ok(())
    }

    #[tokio::test]
    async fn base_path_prefixes_the_key() -> Result<()> {
        let f = fixture();
        let meta = MediaMeta::new("x.png").with_base_path("uploads/2025");
        let record = f.store.save_media(&b"png"[..], meta).await?;

        let key = ObjectKey::for_media(record.id, Some("uploads/2025"));
        assert!(f.blobs.contains(&key));
        assert_eq!(f.store.get_media(record.id).await?.content, Bytes::from_static(b"png"));
        Ok(())
    }

    #[tokio::test]
    async fn reserved_base_path_is_rejected_before_any_call() {
        let f = fixture();
        let meta = MediaMeta::new("x").with_base_path(".vellum");

        let err = f.store.save_media(&b"x"[..], meta).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(f.ledger.calls(LedgerOp::Create), 0);
        assert_eq!(f.blobs.calls(BlobOp::Put), 0);
    }

    #[tokio::test]
    async fn unreadable_input_is_io() {
        let f = fixture();
        let err = f
            .store
            .save_media(BrokenReader, MediaMeta::new("broken"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.phase, Some("read_input"));
        assert!(f.ledger.is_empty());
    }

    #[tokio::test]
    async fn insert_failure_skips_the_blob_write() {
        let f = fixture();
        f.ledger.fail(LedgerOp::Create);

        let err = f
            .store
            .save_media(&b"x"[..], MediaMeta::new("x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert_eq!(err.phase, Some("insert_record"));
        assert_eq!(f.blobs.calls(BlobOp::Put), 0);
    }

    #[tokio::test]
    async fn put_failure_leaves_an_unverified_orphan() {
        let f = fixture();
        f.blobs.fail(BlobOp::Put);

        let err = f
            .store
            .save_media(&b"x"[..], MediaMeta::new("x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(err.phase, Some("put_blob"));

        let id = err.media_id.expect("orphan id");
        let orphan = f.ledger.record(id).expect("orphan record");
        assert!(!orphan.verified);
        assert!(orphan.is_orphan_candidate());
        assert!(f.blobs.keys().is_empty());
    }

    #[tokio::test]
    async fn short_write_is_not_verified() {
        let f = fixture();
        f.blobs.set_short_writes(true);

        let err = f
            .store
            .save_media(&b"abcdef"[..], MediaMeta::new("short"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(err.phase, Some("confirm_blob"));

        let id = err.media_id.expect("id");
        assert!(!f.ledger.record(id).expect("record").verified);
        assert_eq!(f.ledger.calls(LedgerOp::MarkVerified), 0);
    }

    #[tokio::test]
    async fn verify_failure_keeps_the_blob_and_reports_the_error() -> Result<()> {
        let f = fixture();
        f.ledger.fail(LedgerOp::MarkVerified);

        let err = f
            .store
            .save_media(&b"kept"[..], MediaMeta::new("kept"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert_eq!(err.phase, Some("mark_verified"));

        let id = err.media_id.expect("id");
        let record = f.ledger.record(id).expect("record");
        assert!(!record.verified);
        assert!(f.blobs.contains(&ObjectKey::for_record(&record)));

        // Unverified records stay readable.
        let media = f.store.get_media(id).await?;
        assert_eq!(media.content, Bytes::from_static(b"kept"));
        assert!(!media.record.verified);
        Ok(())
    }

    #[tokio::test]
    async fn missing_blob_reads_as_not_found() -> Result<()> {
        let f = fixture();
        let record = f.store.save_media(&b"x"[..], MediaMeta::new("x")).await?;
        f.blobs.remove(&ObjectKey::for_record(&record));

        let err = f.store.get_media(record.id).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.media_id, Some(record.id));
        Ok(())
    }

    #[tokio::test]
    async fn get_transport_errors_keep_their_kind() -> Result<()> {
        let f = fixture();
        let record = f.store.save_media(&b"x"[..], MediaMeta::new("x")).await?;
        f.blobs.fail(BlobOp::Get);

        let err = f.store.get_media(record.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(err.phase, Some("get_blob"));
        Ok(())
    }

    #[tokio::test]
    async fn delete_of_unknown_id_touches_nothing() {
        let f = fixture();
        let err = f.store.delete_media(MediaId::new(404)).await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.media_id, Some(MediaId::new(404)));
        assert_eq!(f.blobs.calls(BlobOp::Delete), 0);
        assert_eq!(f.ledger.calls(LedgerOp::Delete), 0);
    }

    #[tokio::test]
    async fn blob_delete_failure_keeps_the_row() -> Result<()> {
        let f = fixture();
        let record = f.store.save_media(&b"x"[..], MediaMeta::new("x")).await?;
        f.blobs.fail(BlobOp::Delete);

        let err = f.store.delete_media(record.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(err.phase, Some("delete_blob"));
        assert!(f.ledger.record(record.id).is_some());
        assert_eq!(f.ledger.calls(LedgerOp::Delete), 0);
        Ok(())
    }

    #[tokio::test]
    async fn delete_retry_after_blob_is_gone() -> Result<()> {
        let f = fixture();
        let record = f.store.save_media(&b"x"[..], MediaMeta::new("x")).await?;

        // First attempt removed the blob but failed on the row.
        f.ledger.fail(LedgerOp::Delete);
        let err = f.store.delete_media(record.id).await.unwrap_err();
        assert_eq!(err.phase, Some("delete_record"));
        assert!(!f.blobs.contains(&ObjectKey::for_record(&record)));
        assert!(f.ledger.record(record.id).is_some());

        f.ledger.heal(LedgerOp::Delete);
        f.store.delete_media(record.id).await?;
        assert!(f.ledger.is_empty());
        assert_eq!(f.blobs.calls(BlobOp::Delete), 1);

        let err = f.store.delete_media(record.id).await.unwrap_err();
        assert!(err.is_not_found());
        Ok(())
    }

    #[tokio::test]
    async fn batch_delete_removes_everything() -> Result<()> {
        let f = fixture();
        let mut ids = Vec::new();
        for i in 0..5 {
            let record = f
                .store
                .save_media(format!("item-{i}").as_bytes(), MediaMeta::new(format!("{i}")))
                .await?;
            ids.push(record.id);
        }
        ids.push(ids[0]);

        let deleted = f.store.delete_medias(&ids).await?;
        assert_eq!(deleted.len(), 5);
        assert!(f.ledger.is_empty());
        assert!(f.blobs.keys().is_empty());
        assert!(f.store.delete_medias(&[]).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn batch_delete_with_unknown_id_touches_no_blob() -> Result<()> {
        let f = fixture();
        let record = f.store.save_media(&b"x"[..], MediaMeta::new("x")).await?;

        let err = f
            .store
            .delete_medias(&[record.id, MediaId::new(999)])
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.media_id, Some(MediaId::new(999)));
        assert_eq!(f.blobs.calls(BlobOp::Delete), 0);
        assert!(f.ledger.record(record.id).is_some());
        Ok(())
    }

    #[tokio::test]
    async fn batch_delete_blob_failure_keeps_every_row() -> Result<()> {
        let f = fixture();
        let a = f.store.save_media(&b"a"[..], MediaMeta::new("a")).await?;
        let b = f.store.save_media(&b"b"[..], MediaMeta::new("b")).await?;
        f.blobs.fail(BlobOp::Delete);

        let err = f.store.delete_medias(&[a.id, b.id]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(f.ledger.len(), 2);
        assert_eq!(f.ledger.calls(LedgerOp::Delete), 0);
        Ok(())
    }

    #[tokio::test]
    async fn hello_minio_against_an_opendal_backend() -> Result<()> {
        let backend = StorageBackend::new(StorageConfig::memory("media")).await?;
        let ledger = Arc::new(MemoryLedger::new());
        let store = MediaStore::builder()
            .with_ledger(ledger.clone())
            .with_blob_store(Arc::new(backend))
            .build()?;

        let record = store
            .save_media(&b"Hello, MinIO!"[..], MediaMeta::new("hello.txt"))
            .await?;
        assert!(record.verified);
        assert_eq!(record.size, 13);

        let media = store.get_media(record.id).await?;
        assert_eq!(media.name, "hello.txt");
        assert_eq!(media.content, Bytes::from_static(b"Hello, MinIO!"));

        let mut text = String::new();
        media.into_reader().read_to_string(&mut text).await?;
        assert_eq!(text, "Hello, MinIO!");

        assert!(store.health_check().await?.is_healthy());

        store.delete_media(record.id).await?;
        assert!(store.get_media(record.id).await.unwrap_err().is_not_found());
        assert!(ledger.is_empty());
        Ok(())
    }
}
