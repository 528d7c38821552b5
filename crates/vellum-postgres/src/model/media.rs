//! Media model for PostgreSQL database operations.

use diesel::prelude::*;
use jiff_diesel::Timestamp;
use vellum_core::{Error, MediaId, MediaRecord, NewMedia};

use crate::schema::media;

/// A row of the `media` table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = media)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MediaRow {
    /// Ledger-assigned identifier.
    pub id: i64,
    /// Insert time.
    pub created_at: Timestamp,
    /// Original filename.
    pub filename: String,
    /// Content length in bytes, never negative.
    pub size: i64,
    /// Optional storage path override.
    pub base_path: Option<String>,
    /// Whether the blob write has been confirmed.
    pub verified: bool,
}

/// Data for inserting a media row.
///
/// `id`, `created_at` and `verified` are filled in by column defaults.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = media)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewMediaRow {
    /// Original filename.
    pub filename: String,
    /// Content length in bytes.
    pub size: i64,
    /// Optional storage path override.
    pub base_path: Option<String>,
}

impl MediaRow {
    /// Returns the typed identifier.
    #[inline]
    pub fn media_id(&self) -> MediaId {
        MediaId::new(self.id)
    }
}

impl From<MediaRow> for MediaRecord {
    fn from(row: MediaRow) -> Self {
        Self {
            id: MediaId::new(row.id),
            created_at: row.created_at.into(),
            filename: row.filename,
            // Guarded by the `media_size_non_negative` constraint.
            size: u64::try_from(row.size).unwrap_or_default(),
            base_path: row.base_path,
            verified: row.verified,
        }
    }
}

impl TryFrom<NewMedia> for NewMediaRow {
    type Error = Error;

    fn try_from(media: NewMedia) -> Result<Self, Self::Error> {
        let size = i64::try_from(media.size).map_err(|_| {
            Error::invalid_input().with_message(format!(
                "media size {} exceeds the ledger's signed 64-bit range",
                media.size
            ))
        })?;

        Ok(Self {
            filename: media.filename,
            size,
            base_path: media.base_path,
        })
    }
}
