//! Import error taxonomy.
//!
//! Recovery happens at the smallest granularity that still isolates bad
//! data: a single assignment is skipped with a warning inside the
//! reconciler, a malformed record aborts only its own transaction, and
//! only a structurally unreadable feed aborts the run.

use thiserror::Error;

/// Per-record validation failures. The record is skipped and the run
/// continues.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The JSON value is not a person record of the expected shape.
    #[error("record does not match the feed schema: {0}")]
    Shape(#[from] serde_json::Error),

    /// A mandatory field is absent.
    #[error("missing mandatory field `{0}`")]
    MissingField(&'static str),

    /// A date string does not match the feed's date-time pattern.
    #[error("unparseable feed date `{0}`")]
    BadDate(String),
}

/// Failure modes of one person upsert, distinguished so the driver can
/// count skips separately from persistence failures.
#[derive(Debug, Error)]
pub enum UpsertError {
    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Failure modes of a whole import run.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The feed itself cannot be parsed. Fatal.
    #[error("snapshot feed is structurally invalid: {0}")]
    Feed(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
