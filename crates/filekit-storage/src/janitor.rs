//! Retention janitor for the working storage directory.
//!
//! # Design
//! - `sweep_expired` is a pure scan over one directory level, parameterised
//!   on `now` so the eligibility boundary is testable without sleeping.
//! - The background loop scans immediately, then alternates between sleeping
//!   and scanning until its watch-channel stop signal fires.
//! - Per-entry failures are logged, counted and skipped; a scan never aborts.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use filekit_config::StorageSettings;
use filekit_telemetry::Metrics;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{StorageError, StorageResult};

/// Outcome of a single retention scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Regular files inspected.
    pub scanned: u64,
    /// Files removed for exceeding the threshold.
    pub removed: u64,
    /// Entries that could not be inspected or removed.
    pub failed: u64,
}

/// Remove every regular file directly under `root` whose age at `now` is at
/// least `threshold`.
///
/// Files with a modification time later than `now` are kept, directories are
/// never touched, and an entry that vanishes mid-scan is not a failure.
#[must_use]
pub fn sweep_expired(root: &Path, threshold: Duration, now: SystemTime) -> SweepReport {
    let mut report = SweepReport::default();
    if !root.is_dir() {
        debug!(root = %root.display(), "working storage root missing; nothing to sweep");
        return report;
    }

    for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, root = %root.display(), "failed to list working entry");
                report.failed += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        report.scanned += 1;

        let modified = match entry.metadata().map(|meta| meta.modified()) {
            Ok(Ok(modified)) => modified,
            Ok(Err(err)) => {
                warn!(error = %err, path = %entry.path().display(), "failed to read modification time");
                report.failed += 1;
                continue;
            }
            Err(err) => {
                warn!(error = %err, path = %entry.path().display(), "failed to stat working entry");
                report.failed += 1;
                continue;
            }
        };

        let Ok(age) = now.duration_since(modified) else {
            continue;
        };
        if age < threshold {
            continue;
        }

        match fs::remove_file(entry.path()) {
            Ok(()) => {
                debug!(path = %entry.path().display(), age_secs = age.as_secs(), "removed expired entry");
                report.removed += 1;
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(error = %err, path = %entry.path().display(), "failed to remove expired entry");
                report.failed += 1;
            }
        }
    }
    report
}

/// Background task enforcing the retention threshold.
#[derive(Clone)]
pub struct RetentionJanitor {
    root: PathBuf,
    threshold: Duration,
    interval: Duration,
    metrics: Metrics,
}

impl RetentionJanitor {
    /// Configure the janitor from storage settings.
    #[must_use]
    pub fn new(settings: &StorageSettings, metrics: Metrics) -> Self {
        Self::with_timing(
            settings.working_dir.clone(),
            settings.retention,
            settings.sweep_interval,
            metrics,
        )
    }

    /// Configure the janitor with explicit timing.
    #[must_use]
    pub const fn with_timing(
        root: PathBuf,
        threshold: Duration,
        interval: Duration,
        metrics: Metrics,
    ) -> Self {
        Self {
            root,
            threshold,
            interval,
            metrics,
        }
    }

    /// Start the loop on the current runtime.
    #[must_use]
    pub fn spawn(self) -> JanitorHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let (report_tx, report_rx) = watch::channel(None);
        let task = tokio::spawn(self.run(stop_rx, report_tx));
        JanitorHandle {
            stop: stop_tx,
            reports: report_rx,
            task,
        }
    }

    async fn run(
        self,
        mut stop: watch::Receiver<bool>,
        reports: watch::Sender<Option<SweepReport>>,
    ) {
        info!(
            root = %self.root.display(),
            threshold_secs = self.threshold.as_secs(),
            interval_secs = self.interval.as_secs(),
            "retention janitor started"
        );

        while !*stop.borrow() {
            let report = self.scan().await;
            self.metrics
                .record_janitor_sweep(report.removed, report.failed);
            reports.send_replace(Some(report));

            tokio::select! {
                () = tokio::time::sleep(self.interval) => {}
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        info!("retention janitor stopped");
    }

    async fn scan(&self) -> SweepReport {
        let root = self.root.clone();
        let threshold = self.threshold;
        match tokio::task::spawn_blocking(move || {
            sweep_expired(&root, threshold, SystemTime::now())
        })
        .await
        {
            Ok(report) => {
                if report.removed > 0 || report.failed > 0 {
                    info!(
                        scanned = report.scanned,
                        removed = report.removed,
                        failed = report.failed,
                        "retention sweep finished"
                    );
                }
                report
            }
            Err(err) => {
                warn!(error = %err, "retention sweep task failed");
                SweepReport {
                    failed: 1,
                    ..SweepReport::default()
                }
            }
        }
    }
}

/// Owner of a running janitor.
pub struct JanitorHandle {
    stop: watch::Sender<bool>,
    reports: watch::Receiver<Option<SweepReport>>,
    task: JoinHandle<()>,
}

impl JanitorHandle {
    /// Subscribe to per-scan reports; holds `None` until the first scan ends.
    #[must_use]
    pub fn reports(&self) -> watch::Receiver<Option<SweepReport>> {
        self.reports.clone()
    }

    /// Signal the loop to stop and wait for it to exit.
    ///
    /// # Errors
    ///
    /// Returns an error if the task panicked or was aborted.
    pub async fn shutdown(self) -> StorageResult<()> {
        self.stop.send_replace(true);
        self.task.await.map_err(|source| StorageError::Join {
            operation: "janitor.shutdown",
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};
    use std::fs::File;

    const THRESHOLD: Duration = Duration::from_secs(600);

    fn write_with_mtime(dir: &Path, name: &str, modified: SystemTime) -> Result<PathBuf> {
        let path = dir.join(name);
        let file = File::create(&path)?;
        file.set_modified(modified)?;
        Ok(path)
    }

    #[test]
    fn entry_is_kept_until_threshold_and_removed_at_it() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let created = SystemTime::now() - Duration::from_secs(3_600);
        let path = write_with_mtime(dir.path(), "a.png", created)?;

        let early = sweep_expired(dir.path(), THRESHOLD, created + THRESHOLD - Duration::from_secs(1));
        assert_eq!(early.removed, 0);
        assert!(path.exists());

        let due = sweep_expired(dir.path(), THRESHOLD, created + THRESHOLD);
        assert_eq!(
            due,
            SweepReport {
                scanned: 1,
                removed: 1,
                failed: 0
            }
        );
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn future_mtimes_and_directories_are_kept() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let now = SystemTime::now();
        let future = write_with_mtime(dir.path(), "future.pdf", now + Duration::from_secs(60))?;
        let nested = dir.path().join("nested");
        fs::create_dir(&nested)?;
        let inner = write_with_mtime(&nested, "old.png", now - Duration::from_secs(7_200))?;

        let report = sweep_expired(dir.path(), THRESHOLD, now);
        assert_eq!(report.scanned, 1);
        assert_eq!(report.removed, 0);
        assert!(future.exists());
        assert!(nested.is_dir());
        assert!(inner.exists());
        Ok(())
    }

    #[test]
    fn missing_root_is_an_empty_scan() {
        let report = sweep_expired(
            Path::new("/definitely/not/a/filekit/root"),
            THRESHOLD,
            SystemTime::now(),
        );
        assert_eq!(report, SweepReport::default());
    }

    #[tokio::test]
    async fn background_loop_scans_immediately_and_stops_on_signal() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let stale = write_with_mtime(
            dir.path(),
            "stale.jpg",
            SystemTime::now() - Duration::from_secs(7_200),
        )?;
        let fresh = write_with_mtime(dir.path(), "fresh.jpg", SystemTime::now())?;

        let metrics = Metrics::new()?;
        let handle = RetentionJanitor::with_timing(
            dir.path().to_path_buf(),
            THRESHOLD,
            Duration::from_secs(3_600),
            metrics.clone(),
        )
        .spawn();

        let mut reports = handle.reports();
        let first = *tokio::time::timeout(
            Duration::from_secs(5),
            reports.wait_for(Option::is_some),
        )
        .await
        .context("janitor did not report")??;
        let report = first.context("report missing")?;
        assert_eq!(report.removed, 1);
        assert!(!stale.exists());
        assert!(fresh.exists());

        tokio::time::timeout(Duration::from_secs(5), handle.shutdown())
            .await
            .context("janitor did not stop")??;
        assert_eq!(metrics.snapshot().janitor_sweeps_total, 1);
        assert_eq!(metrics.snapshot().janitor_removed_total, 1);
        Ok(())
    }
}
