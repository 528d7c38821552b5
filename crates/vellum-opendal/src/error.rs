//! Storage error types.

use std::time::Duration;

use vellum_core::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backend could not be initialized from its configuration.
    #[error("storage initialization failed: {0}")]
    Init(String),

    /// The provider is unknown or its feature is not compiled in.
    #[error("unsupported media provider `{0}`")]
    UnsupportedProvider(String),

    /// Object not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The call did not complete within the configured deadline.
    #[error("storage call timed out after {0:?}")]
    Timeout(Duration),

    /// Backend-specific error.
    #[error("backend error: {0}")]
    Backend(opendal::Error),
}

impl StorageError {
    /// Creates a new initialization error.
    pub fn init(msg: impl Into<String>) -> Self {
        Self::Init(msg.into())
    }

    /// Creates a new not found error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }
}

impl From<opendal::Error> for StorageError {
    fn from(err: opendal::Error) -> Self {
        match err.kind() {
            opendal::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            _ => Self::Backend(err),
        }
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Init(msg) => Error::configuration().with_message(msg),
            StorageError::UnsupportedProvider(provider) => Error::unsupported_provider(provider),
            StorageError::NotFound(msg) => {
                Error::new(vellum_core::ErrorKind::NotFound).with_message(msg)
            }
            StorageError::Timeout(after) => Error::transport().with_timeout(after),
            StorageError::Backend(err) => Error::transport()
                .with_message(err.to_string())
                .with_source(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use vellum_core::ErrorKind;

    use super::*;

    #[test]
    fn opendal_not_found_is_classified() {
        let err = opendal::Error::new(opendal::ErrorKind::NotFound, "missing");
        assert!(matches!(StorageError::from(err), StorageError::NotFound(_)));

        let err = opendal::Error::new(opendal::ErrorKind::Unexpected, "boom");
        assert!(matches!(StorageError::from(err), StorageError::Backend(_)));
    }

    #[test]
    fn conversion_into_core_kinds() {
        let timeout = Error::from(StorageError::Timeout(Duration::from_secs(30)));
        assert_eq!(timeout.kind(), ErrorKind::Transport);
        assert!(timeout.timeout);

        let unsupported = Error::from(StorageError::UnsupportedProvider("ftp".into()));
        assert_eq!(unsupported.kind(), ErrorKind::UnsupportedProvider);

        let missing = Error::from(StorageError::not_found("7"));
        assert!(missing.is_not_found());

        let init = Error::from(StorageError::init("bucket is required"));
        assert_eq!(init.kind(), ErrorKind::Configuration);
    }
}
