//! [`MediaLedger`] implementation backed by PostgreSQL.
//!
//! Batch operations run every unit of work concurrently against one shared
//! transaction. A diesel connection can only execute one statement at a
//! time, so the transaction handle sits behind an async mutex; all units are
//! joined before the commit or rollback decision is made.

use std::time::Instant;

use diesel_async::scoped_futures::ScopedFutureExt;
use futures::future::join_all;
use tokio::sync::Mutex;
use vellum_core::{Error, MediaId, MediaLedger, MediaRecord, NewMedia, Result};

use crate::model::{MediaRow, NewMediaRow};
use crate::query::MediaRepository;
use crate::{PgClient, PgError, PgResult, PooledConnection, TRACING_TARGET_QUERY};

/// Failure of one unit of work inside a shared transaction.
#[derive(Debug)]
enum UnitError {
    Pg(PgError),
    Missing(MediaId),
}

impl From<PgError> for UnitError {
    fn from(err: PgError) -> Self {
        Self::Pg(err)
    }
}

impl From<diesel::result::Error> for UnitError {
    fn from(err: diesel::result::Error) -> Self {
        Self::Pg(PgError::Query(err))
    }
}

impl From<UnitError> for Error {
    fn from(err: UnitError) -> Self {
        match err {
            UnitError::Pg(err) => err.into(),
            UnitError::Missing(id) => Error::not_found(id),
        }
    }
}

/// Looks up and deletes one record inside a shared transaction.
async fn delete_unit(
    tx: &Mutex<&mut PooledConnection>,
    id: MediaId,
) -> Result<MediaRow, UnitError> {
    let mut conn = tx.lock().await;
    if conn.find_media_row(id.get()).await?.is_none() {
        return Err(UnitError::Missing(id));
    }

    conn.delete_media_row(id.get())
        .await?
        .ok_or(UnitError::Missing(id))
}

impl PgClient {
    /// Finds every record with the given filename, newest first.
    pub async fn find_medias_by_filename(&self, filename: &str) -> PgResult<Vec<MediaRecord>> {
        let mut conn = self.get_connection().await?;
        let rows = conn.find_media_rows_by_filename(filename).await?;
        Ok(rows.into_iter().map(MediaRecord::from).collect())
    }
}

#[async_trait::async_trait]
impl MediaLedger for PgClient {
    async fn create_media(&self, media: NewMedia) -> Result<MediaRecord> {
        let new_row = NewMediaRow::try_from(media)?;
        let mut conn = self.get_connection().await?;
        let row = conn.create_media_row(new_row).await?;

        tracing::debug!(
            target: TRACING_TARGET_QUERY,
            media_id = row.id,
            size = row.size,
            "Inserted media record"
        );

        Ok(row.into())
    }

    async fn create_medias(&self, medias: Vec<NewMedia>) -> Result<Vec<MediaRecord>> {
        if medias.is_empty() {
            return Ok(Vec::new());
        }

        let new_rows = medias
            .into_iter()
            .map(NewMediaRow::try_from)
            .collect::<Result<Vec<_>>>()?;
        let count = new_rows.len();
        let start = Instant::now();

        let mut conn = self.get_connection().await?;
        let created: Result<Vec<MediaRow>, UnitError> = conn
            .transaction(move |tx| {
                async move {
                    let tx = Mutex::new(tx);
                    let units = new_rows.into_iter().map(|new_row| {
                        let tx = &tx;
                        async move { tx.lock().await.create_media_row(new_row).await }
                    });

                    join_all(units)
                        .await
                        .into_iter()
                        .collect::<PgResult<Vec<_>>>()
                        .map_err(UnitError::from)
                }
                .scope_boxed()
            })
            .await;

        let rows = created.inspect_err(|err| {
            tracing::warn!(
                target: TRACING_TARGET_QUERY,
                count,
                error = ?err,
                "Batch insert rolled back"
            );
        })?;

        tracing::debug!(
            target: TRACING_TARGET_QUERY,
            count,
            elapsed_ms = start.elapsed().as_millis(),
            "Inserted media records"
        );

        Ok(rows.into_iter().map(MediaRecord::from).collect())
    }

    async fn find_media(&self, id: MediaId) -> Result<Option<MediaRecord>> {
        let mut conn = self.get_connection().await?;
        let row = conn.find_media_row(id.get()).await?;
        Ok(row.map(MediaRecord::from))
    }

    async fn mark_media_verified(&self, id: MediaId) -> Result<MediaRecord> {
        let mut conn = self.get_connection().await?;
        let row = conn
            .mark_media_row_verified(id.get())
            .await?
            .ok_or_else(|| Error::not_found(id))?;

        tracing::debug!(target: TRACING_TARGET_QUERY, media_id = row.id, "Marked media record verified");
        Ok(row.into())
    }

    async fn delete_medias(&self, ids: &[MediaId]) -> Result<Vec<MediaRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids = ids.to_vec();
        let count = ids.len();

        let mut conn = self.get_connection().await?;
        let deleted: Result<Vec<MediaRow>, UnitError> = conn
            .transaction(move |tx| {
                async move {
                    let tx = Mutex::new(tx);
                    let units = ids.into_iter().map(|id| delete_unit(&tx, id));
                    join_all(units).await.into_iter().collect()
                }
                .scope_boxed()
            })
            .await;

        let rows = deleted.inspect_err(|err| {
            tracing::warn!(
                target: TRACING_TARGET_QUERY,
                count,
                error = ?err,
                "Batch delete rolled back"
            );
        })?;

        tracing::debug!(target: TRACING_TARGET_QUERY, count, "Deleted media records");
        Ok(rows.into_iter().map(MediaRecord::from).collect())
    }

    async fn ping(&self) -> Result<()> {
        PgClient::ping(self).await.map_err(Error::from)
    }
}
