//! Error types for configuration loading.
//!
//! # Design
//! - Keep messages constant; the offending variable and value travel as fields.

use thiserror::Error;

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Primary error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Variable contained a value that could not be parsed or was out of range.
    #[error("invalid configuration value")]
    InvalidValue {
        /// Environment variable that failed validation.
        variable: &'static str,
        /// Machine-readable reason for the failure.
        reason: &'static str,
        /// Offending value.
        value: String,
    },
    /// A variable that only makes sense alongside another one was set alone.
    #[error("incomplete configuration")]
    Incomplete {
        /// Environment variable that is missing.
        variable: &'static str,
        /// Variable whose presence requires `variable`.
        required_by: &'static str,
    },
}

impl ConfigError {
    pub(crate) fn invalid(variable: &'static str, reason: &'static str, value: &str) -> Self {
        Self::InvalidValue {
            variable,
            reason,
            value: value.to_string(),
        }
    }
}
