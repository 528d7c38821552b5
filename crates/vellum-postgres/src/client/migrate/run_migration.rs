use std::time::Instant;

use diesel_async::AsyncPgConnection;
use diesel_async::async_connection_wrapper::AsyncConnectionWrapper;
use diesel_migrations::MigrationHarness;
use tokio::task::spawn_blocking;

use super::{MigrationResult, MigrationStatus};
use crate::{MIGRATIONS, PgClient, PgError, PgResult, TRACING_TARGET_MIGRATION};

type MigrationConnection = AsyncConnectionWrapper<AsyncPgConnection>;

/// Applies all pending migrations.
#[tracing::instrument(skip(pg), target = TRACING_TARGET_MIGRATION)]
pub async fn run_pending_migrations(pg: &PgClient) -> PgResult<MigrationResult> {
    tracing::info!(target: TRACING_TARGET_MIGRATION, "Starting database migration process");

    let start_time = Instant::now();
    let versions = with_harness(pg, |conn| {
        conn.run_pending_migrations(MIGRATIONS)
            .map(|versions| versions.into_iter().map(|v| v.to_string()).collect::<Vec<_>>())
    })
    .await
    .inspect_err(|err| {
        tracing::error!(
            target: TRACING_TARGET_MIGRATION,
            error = %err,
            "Database migration process failed"
        );
    })?;

    let duration = start_time.elapsed();
    tracing::info!(
        target: TRACING_TARGET_MIGRATION,
        duration = ?duration,
        migrations_count = versions.len(),
        "Database migration process completed"
    );

    Ok(MigrationResult::success(duration, versions))
}

/// Lists applied and pending migrations.
#[tracing::instrument(skip(pg), target = TRACING_TARGET_MIGRATION)]
pub async fn get_migration_status(pg: &PgClient) -> PgResult<MigrationStatus> {
    let status = with_harness(pg, |conn| {
        let applied = conn
            .applied_migrations()?
            .into_iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>();
        let pending = conn
            .pending_migrations(MIGRATIONS)?
            .into_iter()
            .map(|m| m.name().version().to_string())
            .collect::<Vec<_>>();
        Ok(MigrationStatus::new(applied, pending))
    })
    .await?;

    tracing::debug!(
        target: TRACING_TARGET_MIGRATION,
        applied_count = status.applied_versions.len(),
        pending_count = status.pending_migrations(),
        "Migration status retrieved"
    );

    Ok(status)
}

/// Runs a synchronous migration harness call on a blocking thread.
async fn with_harness<T, F>(pg: &PgClient, f: F) -> PgResult<T>
where
    F: FnOnce(&mut MigrationConnection) -> diesel::migration::Result<T> + Send + 'static,
    T: Send + 'static,
{
    // The harness needs an owned connection, so one is opened outside the pool.
    let url = pg.config().database_url().to_owned();
    let conn = <AsyncPgConnection as diesel_async::AsyncConnection>::establish(&url).await?;
    let mut conn = MigrationConnection::from(conn);

    spawn_blocking(move || f(&mut conn))
        .await
        .map_err(|err| PgError::Migration(err.into()))?
        .map_err(PgError::Migration)
}
