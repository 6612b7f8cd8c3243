//! Error types for the audit trail.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for audit operations.
pub type AuditResult<T> = Result<T, AuditError>;

/// Failures raised while archiving content or storing records.
///
/// Callers on the request path never propagate these; they are logged,
/// counted and dropped by [`crate::AuditSink`].
#[derive(Debug, Error)]
pub enum AuditError {
    /// Writing the raw snapshot failed.
    #[error("content archive write failed")]
    Archive {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The declared name could not be used for an archive file.
    #[error("content archive name rejected")]
    ArchiveName {
        /// Underlying validation error.
        source: filekit_storage::StorageError,
    },
    /// The connection URL could not be parsed.
    #[error("invalid audit store url")]
    InvalidUrl {
        /// Underlying parse error.
        source: sqlx::Error,
    },
    /// Establishing a connection failed.
    #[error("audit store connection failed")]
    Connect {
        /// Underlying driver error.
        source: sqlx::Error,
    },
    /// Establishing a connection exceeded the configured deadline.
    #[error("audit store connection timed out")]
    ConnectTimeout {
        /// Deadline that elapsed, in seconds.
        timeout_secs: u64,
    },
    /// A statement failed.
    #[error("audit store query failed")]
    Query {
        /// Statement identifier.
        operation: &'static str,
        /// Underlying driver error.
        source: sqlx::Error,
    },
    /// Schema migration failed.
    #[error("audit store migration failed")]
    Migration {
        /// Underlying migration error.
        source: sqlx::migrate::MigrateError,
    },
}
