//! # Design
//!
//! - Only failures that stop the process at startup live here; request-time
//!   failures never reach this type.
//! - Constant messages with an `operation` field naming the failed step.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: filekit_config::ConfigError,
    },
    /// Logging or metrics could not be initialised.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: filekit_telemetry::TelemetryError,
    },
    /// The audit store could not be constructed.
    #[error("audit operation failed")]
    Audit {
        /// Operation identifier.
        operation: &'static str,
        /// Source audit error.
        source: filekit_audit::AuditError,
    },
    /// Working storage could not be prepared.
    #[error("storage operation failed")]
    Storage {
        /// Operation identifier.
        operation: &'static str,
        /// Source storage error.
        source: filekit_storage::StorageError,
    },
    /// Filesystem setup failed.
    #[error("io operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// The HTTP listener failed.
    #[error("api server operation failed")]
    ApiServer {
        /// Operation identifier.
        operation: &'static str,
        /// Source API server error.
        source: filekit_api::ApiServerError,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: filekit_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: filekit_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn audit(operation: &'static str, source: filekit_audit::AuditError) -> Self {
        Self::Audit { operation, source }
    }

    pub(crate) const fn storage(
        operation: &'static str,
        source: filekit_storage::StorageError,
    ) -> Self {
        Self::Storage { operation, source }
    }

    pub(crate) const fn api_server(
        operation: &'static str,
        source: filekit_api::ApiServerError,
    ) -> Self {
        Self::ApiServer { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn helpers_build_variants_with_sources() {
        let config = AppError::config(
            "config.from_env",
            filekit_config::ConfigError::Incomplete {
                variable: "DB_HOST",
                required_by: "DB_USER",
            },
        );
        assert!(matches!(
            config,
            AppError::Config {
                operation: "config.from_env",
                ..
            }
        ));
        assert!(config.source().is_some());

        let api = AppError::api_server(
            "api_server.serve",
            filekit_api::ApiServerError::Serve {
                source: io::Error::other("io"),
            },
        );
        assert_eq!(api.to_string(), "api server operation failed");
    }
}
