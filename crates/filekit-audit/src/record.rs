//! Audit record model.

use std::fmt;

use chrono::{DateTime, Utc};

/// Stored in place of an archive name when nothing was archived.
pub const NOT_ARCHIVED: &str = "N/A";

/// Operation kinds recorded in the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Raster image conversion to PNG.
    ImageConvert,
    /// QR symbol generation.
    QrGenerate,
    /// PDF concatenation.
    PdfMerge,
    /// JPEG re-encoding at fixed quality.
    ImageCompress,
}

impl OperationKind {
    /// Value stored in the `tool_type` column and used as a metric label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ImageConvert => "HEIC_CONVERT",
            Self::QrGenerate => "QR_GEN",
            Self::PdfMerge => "PDF_MERGE",
            Self::ImageCompress => "COMPRESS",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Names of the archived copies belonging to one request.
///
/// Empty means nothing was archived, rendered as [`NOT_ARCHIVED`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveRef {
    names: Vec<String>,
}

impl ArchiveRef {
    /// Reference for a request that archived nothing.
    #[must_use]
    pub const fn none() -> Self {
        Self { names: Vec::new() }
    }

    /// Add the outcome of one snapshot; a failed snapshot adds nothing.
    pub fn push(&mut self, archived: Option<String>) {
        self.names.extend(archived);
    }

    /// Whether at least one copy was archived.
    #[must_use]
    pub fn is_archived(&self) -> bool {
        !self.names.is_empty()
    }

    /// Archived names in submission order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl From<Option<String>> for ArchiveRef {
    fn from(archived: Option<String>) -> Self {
        let mut reference = Self::none();
        reference.push(archived);
        reference
    }
}

impl fmt::Display for ArchiveRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.names.is_empty() {
            f.write_str(NOT_ARCHIVED)
        } else {
            f.write_str(&self.names.join(", "))
        }
    }
}

/// One row of the activity log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    /// When the request arrived.
    pub timestamp: DateTime<Utc>,
    /// Operation that was requested.
    pub kind: OperationKind,
    /// Free-form description of the input.
    pub description: String,
    /// Archived copies of the request content.
    pub archived: ArchiveRef,
}

impl AuditRecord {
    /// Build a record stamped with the current time.
    #[must_use]
    pub fn now(kind: OperationKind, description: impl Into<String>, archived: ArchiveRef) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            description: description.into(),
            archived,
        }
    }
}
