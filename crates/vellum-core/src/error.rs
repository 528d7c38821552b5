//! Common error type definitions.

use std::time::Duration;

use strum::{AsRefStr, Display, IntoStaticStr};
use thiserror::Error;

use crate::MediaId;

/// Type alias for boxed dynamic errors that can be sent across threads.
///
/// Used as the source error in [`Error`], so that backend errors (diesel,
/// deadpool, opendal, io) can be carried without leaking their types into
/// every signature.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for Results with our custom Error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Categories of errors that can occur in vellum operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, IntoStaticStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// The media record or its blob does not exist.
    NotFound,
    /// Network or backend failure against the blob store.
    Transport,
    /// Ledger transaction or commit failure.
    Storage,
    /// Reading the caller's input stream failed.
    Io,
    /// Caller input was rejected before any backend call.
    InvalidInput,
    /// The requested storage provider is unknown or not compiled in.
    UnsupportedProvider,
    /// No ledger was supplied at construction.
    NilLedger,
    /// Configuration is incomplete or out of range.
    Configuration,
}

impl ErrorKind {
    /// Returns whether an operation failing with this kind may succeed on retry.
    ///
    /// Retries are always the caller's decision; nothing in vellum retries
    /// internally.
    #[inline]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Transport | Self::Storage)
    }
}

/// A structured error type for vellum operations.
#[derive(Debug, Error)]
#[error(
    "{kind}{}{}",
    phase.as_ref().map(|p| format!(" during {p}")).unwrap_or_default(),
    message.as_ref().map(|m| format!(": {m}")).unwrap_or_default()
)]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// The media item the error relates to, if any.
    pub media_id: Option<MediaId>,
    /// The coordinator phase that failed (`insert_record`, `put_blob`, ...).
    pub phase: Option<&'static str>,
    /// Whether the failure was a deadline expiry.
    pub timeout: bool,
    /// Optional error message.
    pub message: Option<String>,
    /// Optional source error.
    #[source]
    pub source: Option<BoxedError>,
}

impl Error {
    /// Creates a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            media_id: None,
            phase: None,
            timeout: false,
            message: None,
            source: None,
        }
    }

    /// Adds a message to this error.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Adds a source error to this error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Adds an already boxed source error to this error.
    pub fn with_boxed_source(mut self, source: BoxedError) -> Self {
        self.source = Some(source);
        self
    }

    /// Associates this error with a media item.
    pub fn with_media_id(mut self, id: MediaId) -> Self {
        self.media_id = Some(id);
        self
    }

    /// Records the phase that failed. An existing phase is kept, so the
    /// innermost annotation wins.
    pub fn in_phase(mut self, phase: &'static str) -> Self {
        self.phase.get_or_insert(phase);
        self
    }

    /// Marks this error as a deadline expiry.
    pub fn with_timeout(mut self, after: Duration) -> Self {
        self.timeout = true;
        self.message = Some(format!("timed out after {after:?}"));
        self
    }

    /// Creates a not found error for a media item.
    pub fn not_found(id: MediaId) -> Self {
        Self::new(ErrorKind::NotFound)
            .with_media_id(id)
            .with_message(format!("media {id} does not exist"))
    }

    /// Creates a new transport error.
    pub fn transport() -> Self {
        Self::new(ErrorKind::Transport)
    }

    /// Creates a new storage error.
    pub fn storage() -> Self {
        Self::new(ErrorKind::Storage)
    }

    /// Creates a new io error.
    pub fn io() -> Self {
        Self::new(ErrorKind::Io)
    }

    /// Creates a new invalid input error.
    pub fn invalid_input() -> Self {
        Self::new(ErrorKind::InvalidInput)
    }

    /// Creates an unsupported provider error for the given tag.
    pub fn unsupported_provider(provider: impl AsRef<str>) -> Self {
        Self::new(ErrorKind::UnsupportedProvider)
            .with_message(format!("unsupported media provider `{}`", provider.as_ref()))
    }

    /// Creates the error returned when no ledger was supplied.
    pub fn nil_ledger() -> Self {
        Self::new(ErrorKind::NilLedger).with_message("media ledger cannot be empty")
    }

    /// Creates a new configuration error.
    pub fn configuration() -> Self {
        Self::new(ErrorKind::Configuration)
    }

    /// Returns the error kind.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error kind as a string.
    #[inline]
    pub fn kind_str(&self) -> &'static str {
        self.kind.into()
    }

    /// Returns whether this error is a missing record or blob.
    #[inline]
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    /// Returns whether the failed operation may succeed on retry.
    #[inline]
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::io().with_message(err.to_string()).with_source(err)
    }
}
