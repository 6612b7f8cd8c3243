//! Raw-content snapshots written before any processing.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use filekit_storage::sanitize_file_name;
use filekit_telemetry::Metrics;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{AuditError, AuditResult};

/// Archive name for content declared as `name` and received at `received_at`.
///
/// The UTC timestamp prefix (microsecond resolution) keeps names unique per
/// request in practice and sorts them chronologically.
#[must_use]
pub fn archive_file_name(received_at: DateTime<Utc>, name: &str) -> String {
    format!("{}_{name}", received_at.format("%Y%m%d_%H%M%S_%6f"))
}

/// Permanent directory of byte-identical upload copies. Never purged here.
#[derive(Clone)]
pub struct ContentArchive {
    dir: PathBuf,
    metrics: Metrics,
}

impl ContentArchive {
    /// Archive rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, metrics: Metrics) -> Self {
        Self {
            dir: dir.into(),
            metrics,
        }
    }

    /// Directory receiving snapshots.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy `bytes` into the archive and return the archive name.
    ///
    /// Failures are logged and counted, then discarded: the caller receives
    /// `None` and carries on.
    pub async fn snapshot(&self, declared: &str, bytes: &[u8]) -> Option<String> {
        match self.try_snapshot(declared, bytes).await {
            Ok(name) => Some(name),
            Err(err) => {
                warn!(error = %err, declared, "content archive degraded");
                self.metrics.inc_archive_failure();
                None
            }
        }
    }

    /// Fallible form of [`Self::snapshot`].
    ///
    /// # Errors
    ///
    /// Returns an error if the name is unusable or the copy cannot be written.
    pub async fn try_snapshot(&self, declared: &str, bytes: &[u8]) -> AuditResult<String> {
        let name = sanitize_file_name(declared).map_err(|source| AuditError::ArchiveName { source })?;
        let archived = archive_file_name(Utc::now(), &name);
        let path = self.dir.join(&archived);
        fs::write(&path, bytes)
            .await
            .map_err(|source| AuditError::Archive {
                operation: "archive.write",
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), bytes = bytes.len(), "archived raw content");
        Ok(archived)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use chrono::TimeZone;

    #[test]
    fn archive_name_has_sortable_prefix() -> Result<()> {
        let at = Utc
            .with_ymd_and_hms(2024, 3, 9, 14, 5, 7)
            .single()
            .ok_or_else(|| anyhow::anyhow!("ambiguous timestamp"))?
            + chrono::Duration::microseconds(42);
        assert_eq!(
            archive_file_name(at, "scan.heic"),
            "20240309_140507_000042_scan.heic"
        );
        Ok(())
    }

    #[tokio::test]
    async fn snapshot_copies_bytes_verbatim() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let archive = ContentArchive::new(dir.path(), Metrics::new()?);

        let name = archive
            .snapshot("nested/dir/photo.heic", b"\x00raw bytes\xff")
            .await
            .ok_or_else(|| anyhow::anyhow!("snapshot failed"))?;
        assert!(name.ends_with("_photo.heic"));
        assert_eq!(std::fs::read(dir.path().join(&name))?, b"\x00raw bytes\xff");
        Ok(())
    }

    #[tokio::test]
    async fn unwritable_archive_degrades_to_none() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let metrics = Metrics::new()?;
        let archive = ContentArchive::new(dir.path().join("missing"), metrics.clone());

        assert!(archive.snapshot("a.png", b"x").await.is_none());
        assert!(archive.snapshot("..", b"x").await.is_none());
        assert_eq!(metrics.snapshot().archive_failures_total, 2);
        Ok(())
    }
}
