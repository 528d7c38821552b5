//! Convenient re-exports for common use.

pub use crate::PgConnection;
pub use crate::client::{
    MigrationResult, MigrationStatus, PgClient, PgClientMigrationExt, PgConfig, PgPoolStatus,
};
pub use crate::error::{PgError, PgResult};
pub use crate::query::MediaRepository;
