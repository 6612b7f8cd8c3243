//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes only the counters the request pipeline, audit sink, and janitor report.

use std::sync::Arc;

use prometheus::core::Collector;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    operations_total: IntCounterVec,
    pipeline_steps_total: IntCounterVec,
    archive_failures_total: IntCounter,
    audit_failures_total: IntCounter,
    janitor_sweeps_total: IntCounter,
    janitor_removed_total: IntCounter,
    janitor_errors_total: IntCounter,
}

/// Snapshot of the scalar counters for health reporting and tests.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Raw-content archive writes that degraded to the sentinel.
    pub archive_failures_total: u64,
    /// Structured audit inserts that failed and were discarded.
    pub audit_failures_total: u64,
    /// Completed janitor scans.
    pub janitor_sweeps_total: u64,
    /// Working storage entries removed by the janitor.
    pub janitor_removed_total: u64,
    /// Janitor per-entry failures that were skipped.
    pub janitor_errors_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be built or
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let http_requests_total = counter_vec(
            "http_requests_total",
            "Total HTTP requests received",
            &["route", "code"],
        )?;
        let operations_total = counter_vec(
            "operations_total",
            "Pipeline operations by kind and outcome",
            &["operation", "outcome"],
        )?;
        let pipeline_steps_total = counter_vec(
            "pipeline_steps_total",
            "Pipeline steps executed by status",
            &["step", "status"],
        )?;
        let archive_failures_total = counter(
            "archive_failures_total",
            "Raw content snapshots that could not be written",
        )?;
        let audit_failures_total = counter(
            "audit_failures_total",
            "Audit records that could not be stored",
        )?;
        let janitor_sweeps_total =
            counter("janitor_sweeps_total", "Working storage retention scans")?;
        let janitor_removed_total = counter(
            "janitor_removed_total",
            "Working storage entries removed after exceeding retention",
        )?;
        let janitor_errors_total = counter(
            "janitor_errors_total",
            "Working storage entries the janitor failed to inspect or remove",
        )?;

        register(&registry, "http_requests_total", &http_requests_total)?;
        register(&registry, "operations_total", &operations_total)?;
        register(&registry, "pipeline_steps_total", &pipeline_steps_total)?;
        register(&registry, "archive_failures_total", &archive_failures_total)?;
        register(&registry, "audit_failures_total", &audit_failures_total)?;
        register(&registry, "janitor_sweeps_total", &janitor_sweeps_total)?;
        register(&registry, "janitor_removed_total", &janitor_removed_total)?;
        register(&registry, "janitor_errors_total", &janitor_errors_total)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                http_requests_total,
                operations_total,
                pipeline_steps_total,
                archive_failures_total,
                audit_failures_total,
                janitor_sweeps_total,
                janitor_removed_total,
                janitor_errors_total,
            }),
        })
    }

    /// Increment the HTTP request counter for the given route and status code.
    pub fn inc_http_request(&self, route: &str, status: u16) {
        let code = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[route, code.as_str()])
            .inc();
    }

    /// Increment the operation counter for a finished pipeline invocation.
    pub fn inc_operation(&self, operation: &str, outcome: &str) {
        self.inner
            .operations_total
            .with_label_values(&[operation, outcome])
            .inc();
    }

    /// Increment the pipeline step counter.
    pub fn inc_pipeline_step(&self, step: &str, status: &str) {
        self.inner
            .pipeline_steps_total
            .with_label_values(&[step, status])
            .inc();
    }

    /// Count a raw-content snapshot that degraded to the sentinel.
    pub fn inc_archive_failure(&self) {
        self.inner.archive_failures_total.inc();
    }

    /// Count a discarded audit insert failure.
    pub fn inc_audit_failure(&self) {
        self.inner.audit_failures_total.inc();
    }

    /// Record the outcome of one janitor scan.
    pub fn record_janitor_sweep(&self, removed: u64, errors: u64) {
        self.inner.janitor_sweeps_total.inc();
        self.inner.janitor_removed_total.inc_by(removed);
        self.inner.janitor_errors_total.inc_by(errors);
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::Render { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::RenderUtf8 { source })
    }

    /// Take a point-in-time snapshot of the scalar counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            archive_failures_total: self.inner.archive_failures_total.get(),
            audit_failures_total: self.inner.audit_failures_total.get(),
            janitor_sweeps_total: self.inner.janitor_sweeps_total.get(),
            janitor_removed_total: self.inner.janitor_removed_total.get(),
            janitor_errors_total: self.inner.janitor_errors_total.get(),
        }
    }

    /// Current value of the operation counter for the given labels.
    #[must_use]
    pub fn operation_count(&self, operation: &str, outcome: &str) -> u64 {
        self.inner
            .operations_total
            .with_label_values(&[operation, outcome])
            .get()
    }
}

fn counter(name: &'static str, help: &str) -> Result<IntCounter> {
    IntCounter::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::collector(name, "build", source))
}

fn counter_vec(name: &'static str, help: &str, labels: &[&str]) -> Result<IntCounterVec> {
    IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::collector(name, "build", source))
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::collector(name, "register", source))
}
