//! Embedded schema migrations.
//!
//! Migrations are compiled into the binary and applied through the
//! [`PgClientMigrationExt`] extension trait. Diesel's migration harness is
//! synchronous, so it runs on a blocking thread over an
//! [`AsyncConnectionWrapper`].
//!
//! [`AsyncConnectionWrapper`]: diesel_async::async_connection_wrapper::AsyncConnectionWrapper

mod migrate_result;
mod run_migration;

use std::future::Future;

pub use migrate_result::{MigrationResult, MigrationStatus};
pub use run_migration::{get_migration_status, run_pending_migrations};

use crate::{PgClient, PgResult};

/// Extension trait providing migration functionality for [`PgClient`].
pub trait PgClientMigrationExt {
    /// Applies every pending migration.
    ///
    /// Safe to call repeatedly; an up-to-date schema is a no-op.
    fn run_pending_migrations(&self) -> impl Future<Output = PgResult<MigrationResult>> + Send;

    /// Lists applied and pending migration versions.
    fn get_migration_status(&self) -> impl Future<Output = PgResult<MigrationStatus>> + Send;
}

impl PgClientMigrationExt for PgClient {
    async fn run_pending_migrations(&self) -> PgResult<MigrationResult> {
        run_pending_migrations(self).await
    }

    async fn get_migration_status(&self) -> PgResult<MigrationStatus> {
        get_migration_status(self).await
    }
}
