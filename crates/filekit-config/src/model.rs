//! Typed configuration models consumed by the service components.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Fully resolved service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Working storage and archive locations plus retention policy.
    pub storage: StorageSettings,
    /// HTTP listener and request limits.
    pub http: HttpSettings,
    /// Fixed encoder parameters for the format codecs.
    pub codec: CodecSettings,
    /// Structured-record store connection, `None` when auditing to the log only.
    pub database: Option<DatabaseSettings>,
    /// Requested log output format.
    pub log_format: LogFormatSetting,
}

/// Filesystem locations and the retention policy enforced by the janitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    /// Root of the transient working storage namespace.
    pub working_dir: PathBuf,
    /// Directory receiving raw copies of uploaded content.
    pub archive_dir: PathBuf,
    /// Maximum age of a working storage entry.
    pub retention: Duration,
    /// Sleep between janitor scans.
    pub sweep_interval: Duration,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    /// Interface the listener binds to.
    pub bind_addr: IpAddr,
    /// TCP port, never zero.
    pub port: u16,
    /// Upper bound on accepted request bodies.
    pub max_upload_bytes: usize,
    /// Public site location advertised in the sitemap.
    pub site_url: String,
}

impl HttpSettings {
    /// Socket address for the listener.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

/// Encoder parameters that callers cannot tune.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecSettings {
    /// JPEG quality used by image compression.
    pub jpeg_quality: u8,
    /// Pixel size of a single QR module.
    pub qr_module_px: u32,
}

impl Default for CodecSettings {
    fn default() -> Self {
        Self {
            jpeg_quality: 60,
            qr_module_px: 10,
        }
    }
}

/// Connection parameters for the audit record store.
#[derive(Clone, PartialEq, Eq)]
pub enum DatabaseSettings {
    /// Full connection URL.
    Url {
        /// Postgres connection URL.
        url: String,
        /// Deadline for establishing a connection.
        connect_timeout: Duration,
    },
    /// Discrete credentials.
    Parts {
        /// Database host.
        host: String,
        /// Database port.
        port: u16,
        /// Login role.
        user: Option<String>,
        /// Login password.
        password: Option<String>,
        /// Database name.
        database: Option<String>,
        /// Deadline for establishing a connection.
        connect_timeout: Duration,
    },
}

impl DatabaseSettings {
    /// Deadline for establishing a connection.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        match self {
            Self::Url {
                connect_timeout, ..
            }
            | Self::Parts {
                connect_timeout, ..
            } => *connect_timeout,
        }
    }
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url {
                connect_timeout, ..
            } => f
                .debug_struct("Url")
                .field("url", &"<redacted>")
                .field("connect_timeout", connect_timeout)
                .finish(),
            Self::Parts {
                host,
                port,
                user,
                database,
                connect_timeout,
                ..
            } => f
                .debug_struct("Parts")
                .field("host", host)
                .field("port", port)
                .field("user", user)
                .field("password", &"<redacted>")
                .field("database", database)
                .field("connect_timeout", connect_timeout)
                .finish(),
        }
    }
}

/// Log format requested through configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormatSetting {
    /// Pretty output in debug builds, JSON in release builds.
    #[default]
    Auto,
    /// Structured JSON lines.
    Json,
    /// Human-readable output.
    Pretty,
}
