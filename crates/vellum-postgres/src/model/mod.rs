//! Database models for the media ledger.
//!
//! These are the Diesel row types; conversions to and from the shared
//! domain types in `vellum-core` live next to them.

mod media;

pub use media::{MediaRow, NewMediaRow};
