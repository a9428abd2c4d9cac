//! Error types for continuity persistence
//!
//! These never escape the session monitor: every failure is logged and the
//! previous-run classification falls back to `Unknown`.

use thiserror::Error;

/// Errors that can occur while reading or writing the continuity record
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Filesystem access failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored record could not be decoded
    #[error("corrupt continuity record: {0}")]
    Corrupt(String),

    /// The record could not be encoded
    #[error("failed to encode continuity record: {0}")]
    Encode(String),

    /// The record store reported an error
    #[error("record store error: {0}")]
    Store(#[from] anyhow::Error),
}
