//! Error types for database operations.

use std::borrow::Cow;

pub use deadpool::managed::TimeoutType;
use diesel::ConnectionError;
pub use diesel_async::pooled_connection::PoolError as DieselPoolError;
pub use diesel_async::pooled_connection::deadpool::PoolError as DeadpoolError;
use vellum_core::Error;

use crate::TRACING_TARGET_CONNECTION;

/// Type-erased error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error type for all PostgreSQL ledger operations.
#[derive(Debug, thiserror::Error)]
#[must_use = "database errors should be handled appropriately"]
pub enum PgError {
    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Waiting for, creating or recycling a pooled connection timed out.
    #[error("Database operation timed out: {}", timeout_hint(.0))]
    Timeout(TimeoutType),

    /// Failed to establish or maintain a database connection.
    #[error("Database connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Applying the embedded migrations failed.
    #[error("Database migration error: {0}")]
    Migration(BoxError),

    /// Query execution failed, including constraint violations and failed
    /// commits.
    #[error("Database query error: {0}")]
    Query(#[from] diesel::result::Error),

    /// Anything not covered by the other variants.
    #[error("Unexpected error: {0}")]
    Unexpected(Cow<'static, str>),
}

fn timeout_hint(timeout: &TimeoutType) -> &'static str {
    match timeout {
        TimeoutType::Wait => "connection pool is exhausted",
        TimeoutType::Create => "unable to establish a new connection",
        TimeoutType::Recycle => "failed to recycle a connection",
    }
}

impl From<DeadpoolError> for PgError {
    fn from(value: DeadpoolError) -> Self {
        match value {
            DeadpoolError::Timeout(timeout) => Self::Timeout(timeout),
            DeadpoolError::Backend(DieselPoolError::QueryError(error)) => Self::Query(error),
            DeadpoolError::Backend(DieselPoolError::ConnectionError(error)) => {
                Self::Connection(error)
            }
            DeadpoolError::PostCreateHook(err) => {
                tracing::warn!(target: TRACING_TARGET_CONNECTION, error = %err, "Unexpected post-create hook error");
                Self::Unexpected(err.to_string().into())
            }
            DeadpoolError::NoRuntimeSpecified => {
                tracing::error!(target: TRACING_TARGET_CONNECTION, "No tokio runtime specified for connection pool");
                Self::Unexpected("No runtime specified".into())
            }
            DeadpoolError::Closed => Self::Connection(ConnectionError::InvalidConnectionUrl(
                "Connection pool is closed".into(),
            )),
        }
    }
}

/// Every ledger failure is a storage fault to the coordinator.
impl From<PgError> for Error {
    fn from(err: PgError) -> Self {
        let timed_out = matches!(err, PgError::Timeout(_));
        let mut error = Error::storage().with_message(err.to_string());
        error.timeout = timed_out;
        error.with_source(err)
    }
}

/// Specialized [`Result`] type for database operations.
pub type PgResult<T, E = PgError> = Result<T, E>;

#[cfg(test)]
mod tests {
    use vellum_core::ErrorKind;

    use super::*;

    #[test]
    fn timeouts_map_to_flagged_storage_errors() {
        let err = Error::from(PgError::Timeout(TimeoutType::Wait));
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(err.timeout);
        assert!(err.is_retryable());
        assert!(err.to_string().contains("connection pool is exhausted"));
    }

    #[test]
    fn query_errors_map_to_storage() {
        let err = Error::from(PgError::Query(diesel::result::Error::NotFound));
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(!err.timeout);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn closed_pool_is_a_connection_error() {
        let err = PgError::from(DeadpoolError::Closed);
        assert!(matches!(err, PgError::Connection(_)));
        assert_eq!(Error::from(err).kind(), ErrorKind::Storage);
    }
}
