//! Environment parsing for [`ServiceConfig`].

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{
    CodecSettings, DatabaseSettings, HttpSettings, LogFormatSetting, ServiceConfig,
    StorageSettings,
};

const DEFAULT_WORKING_DIR: &str = "uploads";
const DEFAULT_ARCHIVE_DIR: &str = "monitor_db";
const DEFAULT_RETENTION_SECS: u64 = 600;
const DEFAULT_BIND_ADDR: IpAddr = IpAddr::V4(std::net::Ipv4Addr::LOCALHOST);
const DEFAULT_HTTP_PORT: u16 = 5000;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;
const DEFAULT_SITE_URL: &str = "http://localhost:5000/";
const DEFAULT_DB_PORT: u16 = 5432;
const DEFAULT_DB_CONNECT_TIMEOUT_SECS: u64 = 10;

impl ServiceConfig {
    /// Build the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable holds an invalid value.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable holds an invalid value.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup: &lookup };

        let retention_secs = env.positive_u64("FILEKIT_RETENTION_SECS", DEFAULT_RETENTION_SECS)?;
        let sweep_secs = env.positive_u64("FILEKIT_SWEEP_INTERVAL_SECS", retention_secs)?;
        let storage = StorageSettings {
            working_dir: env.path("FILEKIT_WORKING_DIR", DEFAULT_WORKING_DIR),
            archive_dir: env.path("FILEKIT_ARCHIVE_DIR", DEFAULT_ARCHIVE_DIR),
            retention: Duration::from_secs(retention_secs),
            sweep_interval: Duration::from_secs(sweep_secs),
        };

        let http = HttpSettings {
            bind_addr: env.parsed("FILEKIT_BIND_ADDR", DEFAULT_BIND_ADDR, "invalid_ip")?,
            port: env.port("FILEKIT_HTTP_PORT", DEFAULT_HTTP_PORT)?,
            max_upload_bytes: env.parsed(
                "FILEKIT_MAX_UPLOAD_BYTES",
                DEFAULT_MAX_UPLOAD_BYTES,
                "not_a_number",
            )?,
            site_url: env
                .text("FILEKIT_SITE_URL")
                .unwrap_or_else(|| DEFAULT_SITE_URL.to_string()),
        };

        let defaults = CodecSettings::default();
        let jpeg_quality = env.parsed("FILEKIT_JPEG_QUALITY", defaults.jpeg_quality, "not_a_number")?;
        if !(1..=100).contains(&jpeg_quality) {
            return Err(ConfigError::invalid(
                "FILEKIT_JPEG_QUALITY",
                "out_of_range",
                &jpeg_quality.to_string(),
            ));
        }
        let qr_module_px = env.parsed("FILEKIT_QR_MODULE_PX", defaults.qr_module_px, "not_a_number")?;
        if qr_module_px == 0 {
            return Err(ConfigError::invalid("FILEKIT_QR_MODULE_PX", "zero", "0"));
        }
        let codec = CodecSettings {
            jpeg_quality,
            qr_module_px,
        };

        Ok(Self {
            storage,
            http,
            codec,
            database: database_settings(&env)?,
            log_format: log_format(env.text("FILEKIT_LOG_FORMAT").as_deref())?,
        })
    }
}

fn database_settings<F>(env: &Env<'_, F>) -> ConfigResult<Option<DatabaseSettings>>
where
    F: Fn(&str) -> Option<String>,
{
    let connect_timeout = Duration::from_secs(
        env.positive_u64("DB_CONNECT_TIMEOUT_SECS", DEFAULT_DB_CONNECT_TIMEOUT_SECS)?,
    );

    if let Some(url) = env.text("DATABASE_URL") {
        if env.text("DB_HOST").is_some() {
            debug!("DATABASE_URL set; ignoring DB_HOST and related variables");
        }
        return Ok(Some(DatabaseSettings::Url {
            url,
            connect_timeout,
        }));
    }

    let Some(host) = env.text("DB_HOST") else {
        for variable in ["DB_USER", "DB_PASSWORD", "DB_NAME", "DB_PORT"] {
            if env.text(variable).is_some() {
                return Err(ConfigError::Incomplete {
                    variable: "DB_HOST",
                    required_by: variable,
                });
            }
        }
        return Ok(None);
    };

    Ok(Some(DatabaseSettings::Parts {
        host,
        port: env.port("DB_PORT", DEFAULT_DB_PORT)?,
        user: env.text("DB_USER"),
        password: env.text("DB_PASSWORD"),
        database: env.text("DB_NAME"),
        connect_timeout,
    }))
}

fn log_format(value: Option<&str>) -> ConfigResult<LogFormatSetting> {
    match value.map(|raw| raw.trim().to_ascii_lowercase()).as_deref() {
        None | Some("" | "auto") => Ok(LogFormatSetting::Auto),
        Some("json") => Ok(LogFormatSetting::Json),
        Some("pretty") => Ok(LogFormatSetting::Pretty),
        Some(other) => Err(ConfigError::invalid(
            "FILEKIT_LOG_FORMAT",
            "unknown_format",
            other,
        )),
    }
}

struct Env<'a, F> {
    lookup: &'a F,
}

impl<F> Env<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Trimmed, non-empty value of `name`.
    fn text(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn path(&self, name: &str, default: &str) -> PathBuf {
        PathBuf::from(self.text(name).unwrap_or_else(|| default.to_string()))
    }

    fn parsed<T>(&self, name: &'static str, default: T, reason: &'static str) -> ConfigResult<T>
    where
        T: std::str::FromStr,
    {
        self.text(name).map_or(Ok(default), |raw| {
            raw.parse::<T>()
                .map_err(|_| ConfigError::invalid(name, reason, &raw))
        })
    }

    fn positive_u64(&self, name: &'static str, default: u64) -> ConfigResult<u64> {
        let value = self.parsed(name, default, "not_a_number")?;
        if value == 0 {
            return Err(ConfigError::invalid(name, "zero", "0"));
        }
        Ok(value)
    }

    fn port(&self, name: &'static str, default: u16) -> ConfigResult<u16> {
        let port = self.parsed(name, default, "out_of_range")?;
        if port == 0 {
            return Err(ConfigError::invalid(name, "zero", "0"));
        }
        Ok(port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> ConfigResult<ServiceConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        ServiceConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_match_service_contract() -> anyhow::Result<()> {
        let config = load(&[])?;
        assert_eq!(config.storage.working_dir, PathBuf::from("uploads"));
        assert_eq!(config.storage.archive_dir, PathBuf::from("monitor_db"));
        assert_eq!(config.storage.retention, Duration::from_secs(600));
        assert_eq!(config.storage.sweep_interval, Duration::from_secs(600));
        assert_eq!(config.http.port, 5000);
        assert!(config.http.bind_addr.is_loopback());
        assert_eq!(config.codec, CodecSettings::default());
        assert!(config.database.is_none());
        assert_eq!(config.log_format, LogFormatSetting::Auto);
        Ok(())
    }

    #[test]
    fn sweep_interval_follows_retention_unless_overridden() -> anyhow::Result<()> {
        let config = load(&[("FILEKIT_RETENTION_SECS", "30")])?;
        assert_eq!(config.storage.sweep_interval, Duration::from_secs(30));

        let config = load(&[
            ("FILEKIT_RETENTION_SECS", "30"),
            ("FILEKIT_SWEEP_INTERVAL_SECS", "5"),
        ])?;
        assert_eq!(config.storage.retention, Duration::from_secs(30));
        assert_eq!(config.storage.sweep_interval, Duration::from_secs(5));
        Ok(())
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            load(&[("FILEKIT_RETENTION_SECS", "0")]),
            Err(ConfigError::InvalidValue {
                variable: "FILEKIT_RETENTION_SECS",
                reason: "zero",
                ..
            })
        ));
        assert!(matches!(
            load(&[("FILEKIT_HTTP_PORT", "70000")]),
            Err(ConfigError::InvalidValue {
                variable: "FILEKIT_HTTP_PORT",
                ..
            })
        ));
        assert!(matches!(
            load(&[("FILEKIT_JPEG_QUALITY", "101")]),
            Err(ConfigError::InvalidValue {
                reason: "out_of_range",
                ..
            })
        ));
        assert!(matches!(
            load(&[("FILEKIT_BIND_ADDR", "not-an-ip")]),
            Err(ConfigError::InvalidValue {
                reason: "invalid_ip",
                ..
            })
        ));
        assert!(matches!(
            load(&[("FILEKIT_LOG_FORMAT", "xml")]),
            Err(ConfigError::InvalidValue {
                reason: "unknown_format",
                ..
            })
        ));
    }

    #[test]
    fn database_from_discrete_variables() -> anyhow::Result<()> {
        let config = load(&[
            ("DB_HOST", "db.internal"),
            ("DB_USER", "filekit"),
            ("DB_PASSWORD", "secret"),
            ("DB_NAME", "audit"),
        ])?;
        let Some(DatabaseSettings::Parts {
            host,
            port,
            user,
            database,
            connect_timeout,
            ..
        }) = config.database
        else {
            anyhow::bail!("expected discrete database settings");
        };
        assert_eq!(host, "db.internal");
        assert_eq!(port, 5432);
        assert_eq!(user.as_deref(), Some("filekit"));
        assert_eq!(database.as_deref(), Some("audit"));
        assert_eq!(connect_timeout, Duration::from_secs(10));
        Ok(())
    }

    #[test]
    fn database_url_takes_precedence() -> anyhow::Result<()> {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/audit"),
            ("DB_HOST", "ignored"),
        ])?;
        assert!(matches!(
            config.database,
            Some(DatabaseSettings::Url { ref url, .. }) if url == "postgres://localhost/audit"
        ));
        Ok(())
    }

    #[test]
    fn credentials_without_host_are_rejected() {
        assert!(matches!(
            load(&[("DB_USER", "filekit")]),
            Err(ConfigError::Incomplete {
                variable: "DB_HOST",
                required_by: "DB_USER"
            })
        ));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() -> anyhow::Result<()> {
        let config = load(&[("FILEKIT_WORKING_DIR", "   "), ("FILEKIT_LOG_FORMAT", " JSON ")])?;
        assert_eq!(config.storage.working_dir, PathBuf::from("uploads"));
        assert_eq!(config.log_format, LogFormatSetting::Json);
        Ok(())
    }
}
