//! Startup and shutdown sequence.
//!
//! Order: configuration, logging, metrics, directories, audit store (with
//! schema migration), pipeline, janitor, HTTP listener. On shutdown the
//! listener drains first, then pending audit inserts are awaited, then the
//! janitor is stopped and joined.

use std::future::Future;

use filekit_api::ApiServer;
use filekit_audit::{AuditSink, ContentArchive, store_from_settings};
use filekit_codec::FormatCodecs;
use filekit_config::{LogFormatSetting, ServiceConfig};
use filekit_pipeline::RequestPipeline;
use filekit_storage::{RetentionJanitor, WorkingStorage};
use filekit_telemetry::{GlobalContextGuard, LogFormat, LoggingConfig, Metrics, init_logging};
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult};

/// Dependencies resolved before anything is spawned.
pub(crate) struct BootstrapDependencies {
    config: ServiceConfig,
    telemetry: Metrics,
}

impl BootstrapDependencies {
    /// Load configuration from the environment and build the metrics registry.
    pub(crate) fn from_env() -> AppResult<Self> {
        let config =
            ServiceConfig::from_env().map_err(|err| AppError::config("config.from_env", err))?;
        Self::with_config(config)
    }

    pub(crate) fn with_config(config: ServiceConfig) -> AppResult<Self> {
        let telemetry =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
        Ok(Self { config, telemetry })
    }
}

/// Entry point for the filekit boot sequence.
///
/// # Errors
///
/// Returns an error if configuration, logging, directory setup or the HTTP
/// listener fail.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env()?;
    let logging = logging_config(dependencies.config.log_format);
    init_logging(&logging).map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new("filekit");

    run_app_with(dependencies, shutdown_signal()).await
}

/// Boot sequence over injected dependencies; returns once `shutdown`
/// resolves and every background task has stopped.
pub(crate) async fn run_app_with<F>(dependencies: BootstrapDependencies, shutdown: F) -> AppResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let BootstrapDependencies { config, telemetry } = dependencies;
    info!(
        working_dir = %config.storage.working_dir.display(),
        archive_dir = %config.storage.archive_dir.display(),
        retention_secs = config.storage.retention.as_secs(),
        "filekit bootstrap starting"
    );

    let storage = WorkingStorage::new(config.storage.working_dir.clone());
    storage
        .ensure_root()
        .await
        .map_err(|err| AppError::storage("working_storage.ensure_root", err))?;
    tokio::fs::create_dir_all(&config.storage.archive_dir)
        .await
        .map_err(|source| AppError::Io {
            operation: "archive.create_dir",
            path: config.storage.archive_dir.clone(),
            source,
        })?;

    let store = store_from_settings(config.database.as_ref())
        .await
        .map_err(|err| AppError::audit("audit.store", err))?;
    let audit = AuditSink::new(
        ContentArchive::new(config.storage.archive_dir.clone(), telemetry.clone()),
        store,
        telemetry.clone(),
    );
    let pipeline = RequestPipeline::new(
        storage,
        audit.clone(),
        FormatCodecs::new(config.codec),
        telemetry.clone(),
    );

    let janitor = RetentionJanitor::new(&config.storage, telemetry.clone()).spawn();
    let api = ApiServer::new(pipeline, telemetry, &config.http);
    let addr = config.http.socket_addr();
    info!(addr = %addr, "launching API listener");
    let serve_result = api.serve(addr, shutdown).await;

    let pending = audit.in_flight();
    if pending > 0 {
        info!(pending, "waiting for audit inserts");
    }
    audit.drain().await;

    if let Err(err) = janitor.shutdown().await {
        warn!(error = %err, "retention janitor did not stop cleanly");
    }

    if let Err(err) = serve_result {
        error!(error = %err, "API server exited with error");
        return Err(AppError::api_server("api_server.serve", err));
    }

    info!("filekit stopped");
    Ok(())
}

fn logging_config(format: LogFormatSetting) -> LoggingConfig<'static> {
    let format = match format {
        LogFormatSetting::Auto => LogFormat::infer(),
        LogFormatSetting::Json => LogFormat::Json,
        LogFormatSetting::Pretty => LogFormat::Pretty,
    };
    LoggingConfig {
        format,
        ..LoggingConfig::default()
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to install Ctrl-C handler; running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
