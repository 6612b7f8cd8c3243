//! # Design
//!
//! - Constant error messages with the operation and path carried as fields.
//! - Name validation failures keep the offending value for logs.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for working storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors produced by working storage and the janitor.
#[derive(Debug, Error)]
pub enum StorageError {
    /// IO failures while interacting with the filesystem.
    #[error("storage io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// A caller-declared file name cannot be used inside working storage.
    #[error("invalid file name")]
    InvalidName {
        /// Static reason for the rejection.
        reason: &'static str,
        /// Name as declared by the caller.
        value: String,
    },
    /// A background task terminated abnormally.
    #[error("storage task failed")]
    Join {
        /// Task that failed to join.
        operation: &'static str,
        /// Underlying join error.
        source: tokio::task::JoinError,
    },
}

impl StorageError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_name(reason: &'static str, value: &str) -> Self {
        Self::InvalidName {
            reason,
            value: value.to_string(),
        }
    }
}
