//! Database query repositories.
//!
//! Repositories are implemented for [`PgConnection`] so they work the same on
//! a pooled connection and inside a transaction.
//!
//! [`PgConnection`]: crate::PgConnection

mod media;

pub use media::MediaRepository;
