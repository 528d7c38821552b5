//! Media repository for ledger row operations.

use std::future::Future;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::model::{MediaRow, NewMediaRow};
use crate::{PgConnection, PgError, PgResult, schema};

/// Repository for media ledger database operations.
///
/// Every method issues a single statement, so callers decide the transaction
/// boundaries.
pub trait MediaRepository {
    /// Inserts a new unverified media row.
    fn create_media_row(
        &mut self,
        new_media: NewMediaRow,
    ) -> impl Future<Output = PgResult<MediaRow>> + Send;

    /// Finds a media row by id, regardless of its verification state.
    fn find_media_row(&mut self, media_id: i64)
    -> impl Future<Output = PgResult<Option<MediaRow>>> + Send;

    /// Finds media rows by filename, newest first.
    fn find_media_rows_by_filename(
        &mut self,
        filename: &str,
    ) -> impl Future<Output = PgResult<Vec<MediaRow>>> + Send;

    /// Sets `verified` on a media row, returning `None` when no row matched.
    fn mark_media_row_verified(
        &mut self,
        media_id: i64,
    ) -> impl Future<Output = PgResult<Option<MediaRow>>> + Send;

    /// Deletes a media row, returning `None` when no row matched.
    fn delete_media_row(
        &mut self,
        media_id: i64,
    ) -> impl Future<Output = PgResult<Option<MediaRow>>> + Send;
}

impl MediaRepository for PgConnection {
    async fn create_media_row(&mut self, new_media: NewMediaRow) -> PgResult<MediaRow> {
        use schema::media;

        let row = diesel::insert_into(media::table)
            .values(&new_media)
            .returning(MediaRow::as_returning())
            .get_result(self)
            .await
            .map_err(PgError::from)?;

        Ok(row)
    }

    async fn find_media_row(&mut self, media_id: i64) -> PgResult<Option<MediaRow>> {
        use schema::media::{self, dsl};

        let row = media::table
            .filter(dsl::id.eq(media_id))
            .select(MediaRow::as_select())
            .first(self)
            .await
            .optional()
            .map_err(PgError::from)?;

        Ok(row)
    }

    async fn find_media_rows_by_filename(&mut self, filename: &str) -> PgResult<Vec<MediaRow>> {
        use schema::media::{self, dsl};

        let rows = media::table
            .filter(dsl::filename.eq(filename))
            .order(dsl::created_at.desc())
            .select(MediaRow::as_select())
            .load(self)
            .await
            .map_err(PgError::from)?;

        Ok(rows)
    }

    async fn mark_media_row_verified(&mut self, media_id: i64) -> PgResult<Option<MediaRow>> {
        use schema::media::{self, dsl};

        let row = diesel::update(media::table.filter(dsl::id.eq(media_id)))
            .set(dsl::verified.eq(true))
            .returning(MediaRow::as_returning())
            .get_result(self)
            .await
            .optional()
            .map_err(PgError::from)?;

        Ok(row)
    }

    async fn delete_media_row(&mut self, media_id: i64) -> PgResult<Option<MediaRow>> {
        use schema::media::{self, dsl};

        let row = diesel::delete(media::table.filter(dsl::id.eq(media_id)))
            .returning(MediaRow::as_returning())
            .get_result(self)
            .await
            .optional()
            .map_err(PgError::from)?;

        Ok(row)
    }
}
