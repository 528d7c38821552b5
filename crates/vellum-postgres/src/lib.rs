#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Embeds all migrations into the final binary.
pub(crate) const MIGRATIONS: diesel_migrations::EmbeddedMigrations =
    diesel_migrations::embed_migrations!();

// Tracing target constants for consistent logging.

/// Tracing target for ledger query operations.
pub const TRACING_TARGET_QUERY: &str = "vellum_postgres::query";

/// Tracing target for database migration operations.
pub const TRACING_TARGET_MIGRATION: &str = "vellum_postgres::migration";

/// Tracing target for connection and pool management.
pub const TRACING_TARGET_CONNECTION: &str = "vellum_postgres::connection";

mod client;
mod error;
mod ledger;
pub mod model;
pub mod query;
mod schema;

#[doc(hidden)]
pub mod prelude;

pub use diesel_async::AsyncPgConnection as PgConnection;

pub use crate::client::{
    ConnectionPool, MigrationResult, MigrationStatus, PgClient, PgClientMigrationExt, PgConfig,
    PgConn, PgPoolStatus, PooledConnection,
};
pub use crate::error::{BoxError, PgError, PgResult, TimeoutType};
