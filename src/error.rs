//! Error types for Cassette

use std::io;

use thiserror::Error;

use crate::config::RecordMode;
use crate::transport::BoxError;

/// Result type for Cassette operations
pub type Result<T> = std::result::Result<T, CassetteError>;

/// Errors that can occur in Cassette
#[derive(Debug, Error)]
pub enum CassetteError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Archive content could not be decoded
    #[error("Invalid archive format: {0}")]
    InvalidArchiveFormat(String),

    /// Record mode forbids recording a new interaction
    #[error("Cannot record {method} {url}: no matching interaction and record mode is '{mode}'")]
    CannotRecord {
        /// Active record mode
        mode: RecordMode,
        /// Requested method
        method: String,
        /// Requested URL
        url: String,
    },

    /// Failure reported by the wrapped transport, kept as the error source
    #[error("Transport error: {0}")]
    Transport(#[source] BoxError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Response body too large to materialize
    #[error("Data too large: {size} bytes exceeds limit of {limit} bytes")]
    DataTooLarge {
        /// Actual size
        size: usize,
        /// Size limit
        limit: usize,
    },

    /// Invalid cassette name
    #[error("Invalid cassette name: {0}")]
    InvalidCassetteName(String),
}

impl CassetteError {
    /// Check if this error is a record-mode refusal
    #[must_use]
    pub fn is_cannot_record(&self) -> bool {
        matches!(self, Self::CannotRecord { .. })
    }

    /// Check if this error is an archive decode failure
    #[must_use]
    pub fn is_invalid_archive(&self) -> bool {
        matches!(self, Self::InvalidArchiveFormat(_))
    }

    /// Borrow the wrapped transport's error, if this is a transport failure
    #[must_use]
    pub fn transport_source(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Transport(source) => Some(source.as_ref()),
            _ => None,
        }
    }
}
