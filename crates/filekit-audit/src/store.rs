//! Structured record stores.
//!
//! # Design
//! - `AuditStore` is the seam the sink writes through; tests substitute stubs.
//! - The Postgres store opens a fresh connection per insert and closes it
//!   immediately; nothing is pooled or shared between requests.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use filekit_config::DatabaseSettings;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use tracing::{debug, info, warn};

use crate::error::{AuditError, AuditResult};
use crate::record::AuditRecord;

const INSERT_ACTIVITY: &str = r"
    INSERT INTO activity_log (timestamp, tool_type, input_data, file_saved_as)
    VALUES ($1, $2, $3, $4)
";

/// Destination for structured audit records.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Append one record.
    async fn insert(&self, record: &AuditRecord) -> AuditResult<()>;
}

/// Build the store selected by configuration.
///
/// With a database configured the schema is migrated first; a migration
/// failure is logged and the store is returned anyway, so inserts keep being
/// attempted (and individually reported) once the database comes back.
///
/// # Errors
///
/// Returns an error if the configured URL cannot be parsed.
pub async fn store_from_settings(
    settings: Option<&DatabaseSettings>,
) -> AuditResult<Arc<dyn AuditStore>> {
    let Some(settings) = settings else {
        warn!("no database configured; audit records are written to the log only");
        return Ok(Arc::new(DisabledAuditStore));
    };
    let store = PgAuditStore::from_settings(settings)?;
    if let Err(err) = store.prepare().await {
        warn!(error = %err, "audit schema migration failed");
    }
    Ok(Arc::new(store))
}

/// Postgres-backed store using one short-lived connection per call.
#[derive(Debug, Clone)]
pub struct PgAuditStore {
    options: PgConnectOptions,
    connect_timeout: Duration,
}

impl PgAuditStore {
    /// Translate configuration into connection options.
    ///
    /// # Errors
    ///
    /// Returns an error if a URL is configured and cannot be parsed.
    pub fn from_settings(settings: &DatabaseSettings) -> AuditResult<Self> {
        let options = match settings {
            DatabaseSettings::Url { url, .. } => {
                PgConnectOptions::from_str(url).map_err(|source| AuditError::InvalidUrl { source })?
            }
            DatabaseSettings::Parts {
                host,
                port,
                user,
                password,
                database,
                ..
            } => {
                let mut options = PgConnectOptions::new().host(host).port(*port);
                if let Some(user) = user {
                    options = options.username(user);
                }
                if let Some(password) = password {
                    options = options.password(password);
                }
                if let Some(database) = database {
                    options = options.database(database);
                }
                options
            }
        };
        Ok(Self {
            options,
            connect_timeout: settings.connect_timeout(),
        })
    }

    /// Apply pending schema migrations over a single connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the database is unreachable or a migration fails.
    pub async fn prepare(&self) -> AuditResult<()> {
        let mut conn = self.connect().await?;
        let outcome = sqlx::migrate!("./migrations")
            .run(&mut conn)
            .await
            .map_err(|source| AuditError::Migration { source });
        close(conn).await;
        outcome?;
        info!("audit schema ready");
        Ok(())
    }

    async fn connect(&self) -> AuditResult<PgConnection> {
        tokio::time::timeout(self.connect_timeout, PgConnection::connect_with(&self.options))
            .await
            .map_err(|_| AuditError::ConnectTimeout {
                timeout_secs: self.connect_timeout.as_secs(),
            })?
            .map_err(|source| AuditError::Connect { source })
    }
}

#[async_trait]
impl AuditStore for PgAuditStore {
    async fn insert(&self, record: &AuditRecord) -> AuditResult<()> {
        let mut conn = self.connect().await?;
        let outcome = sqlx::query(INSERT_ACTIVITY)
            .bind(record.timestamp)
            .bind(record.kind.as_str())
            .bind(&record.description)
            .bind(record.archived.to_string())
            .execute(&mut conn)
            .await
            .map_err(|source| AuditError::Query {
                operation: "activity_log.insert",
                source,
            });
        close(conn).await;
        outcome.map(|_| ())
    }
}

async fn close(conn: PgConnection) {
    if let Err(err) = conn.close().await {
        debug!(error = %err, "audit connection did not close cleanly");
    }
}

/// Store used when no database is configured; records go to the log only.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledAuditStore;

#[async_trait]
impl AuditStore for DisabledAuditStore {
    async fn insert(&self, record: &AuditRecord) -> AuditResult<()> {
        info!(
            timestamp = %record.timestamp,
            tool_type = record.kind.as_str(),
            input_data = %record.description,
            file_saved_as = %record.archived,
            "audit record"
        );
        Ok(())
    }
}
