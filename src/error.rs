//! Error taxonomy shared by every component in the crate.
//!
//! The kinds mirror the error taxonomy in the design doc: callers match on
//! `Error` variants rather than string contents. Every variant carries a
//! human-readable message for logging and diagnostics.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// The error kinds produced by this crate.
///
/// Hot-path failures (search, distance) are returned directly to the caller
/// with no retry. Persistence failures never leave a namespace half-updated:
/// codecs build into fresh buffers and only swap in the result on success.
#[derive(Debug, Error)]
pub enum Error {
    /// NULL/None inputs, zero dimension, dimension mismatch, bad range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Slot or posting-list index beyond live bounds.
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// Missing namespace, snapshot, version, role, or named field.
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate namespace or field name.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Insert into an untrained trainable index; persistence magic/version mismatch.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// Namespace capacity or byte quota reached.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Allocation failure.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// File read/write failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Truncated or invalid on-disk record.
    #[error("corrupt: {0}")]
    Corrupt(String),
}

impl Error {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub fn out_of_range(msg: impl Into<String>) -> Self {
        Error::OutOfRange(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    pub fn already_exists(msg: impl Into<String>) -> Self {
        Error::AlreadyExists(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Error::PreconditionFailed(msg.into())
    }

    pub fn quota(msg: impl Into<String>) -> Self {
        Error::QuotaExceeded(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Error::Corrupt(msg.into())
    }
}
