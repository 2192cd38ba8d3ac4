//! Identifier and sharded-path utilities.
//!
//! HealthBot stores account records under sharded directories derived from a UUID, and orders
//! consultations and chat messages by time-prefixed identifiers.
//!
//! ## Canonical UUID form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! This is the same value you would get from `Uuid::new_v4().simple().to_string()`. Externally
//! supplied identifiers (CLI arguments, API paths) must already be canonical; use
//! [`RecordId::parse`] to validate them.
//!
//! ## Sharded directory layout
//! For a canonical UUID `u`, records live under `parent_dir/<u[0..2]>/<u[2..4]>/<u>/`, e.g.
//! `healthbot_data/users/55/0e/550e8400e29b41d4a716446655440000/`.
//!
//! ## Timestamp identifiers
//! [`TimestampId`] values look like `20260111T143522.045Z-550e8400e29b41d4a716446655440000`.
//! Their string form sorts in creation order, which lets consultation history and chat
//! transcripts be listed by sorting file names.

mod service;

pub use service::{RecordId, TimestampId, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
