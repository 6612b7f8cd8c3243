//! Error types for telemetry operations.

use thiserror::Error;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Errors raised by telemetry helpers.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global subscriber was already installed or could not be set.
    #[error("failed to install tracing subscriber")]
    SubscriberInstall {
        /// Underlying tracing subscriber error.
        source: tracing_subscriber::util::TryInitError,
    },
    /// A collector could not be built or added to the registry.
    #[error("failed to set up metrics collector")]
    Collector {
        /// Metric name.
        name: &'static str,
        /// `build` or `register`.
        stage: &'static str,
        /// Underlying Prometheus error.
        source: prometheus::Error,
    },
    /// The registry could not be rendered in the text exposition format.
    #[error("failed to render metrics")]
    Render {
        /// Underlying Prometheus error.
        source: prometheus::Error,
    },
    /// Rendered metrics output was not valid UTF-8.
    #[error("metrics output was not valid utf-8")]
    RenderUtf8 {
        /// Underlying UTF-8 conversion error.
        source: std::string::FromUtf8Error,
    },
}

impl TelemetryError {
    pub(crate) const fn collector(
        name: &'static str,
        stage: &'static str,
        source: prometheus::Error,
    ) -> Self {
        Self::Collector {
            name,
            stage,
            source,
        }
    }
}
