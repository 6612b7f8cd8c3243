//! Request pipeline service.
//!
//! Every operation follows the same order: raw snapshot (content-bearing
//! requests only), stage into working storage, load, transform on the
//! blocking pool, emit, clean up, then one structured audit insert queued in
//! the background. Failures in the snapshot, cleanup and audit steps are
//! logged and dropped; any other failure ends the request with a
//! [`ProcessingError`].

use std::future::Future;

use chrono::{DateTime, Utc};
use filekit_audit::{ArchiveRef, AuditRecord, AuditSink, OperationKind};
use filekit_codec::{
    CodecResult, FormatCodecs, JPEG_CONTENT_TYPE, PDF_CONTENT_TYPE, PNG_CONTENT_TYPE,
    converted_file_name,
};
use filekit_storage::{StagedEntry, WorkingStorage};
use filekit_telemetry::{Metrics, current_request_id};
use tracing::{debug, info, warn};

use crate::error::{ProcessingError, StepError};
use crate::model::{Artifact, Disposition, OperationRequest, Upload};

const QR_FILE_NAME: &str = "qrcode.png";
const MERGED_FILE_NAME: &str = "merged.pdf";
const COMPRESSED_FILE_NAME: &str = "compressed.jpg";
const IMAGE_DESCRIPTION: &str = "Image Uploaded";

/// Description recorded when no field of the request could be read.
fn fieldless_description(operation: OperationKind) -> String {
    match operation {
        OperationKind::ImageConvert | OperationKind::ImageCompress => IMAGE_DESCRIPTION.to_string(),
        OperationKind::QrGenerate => "URL: ".to_string(),
        OperationKind::PdfMerge => "Merged 0 files".to_string(),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StepKind {
    Archive,
    Stage,
    Load,
    Transform,
    Emit,
    Cleanup,
}

impl StepKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Archive => "archive",
            Self::Stage => "stage",
            Self::Load => "load",
            Self::Transform => "transform",
            Self::Emit => "emit",
            Self::Cleanup => "cleanup",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StepStatus {
    Completed,
    Failed,
    Skipped,
}

impl StepStatus {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// Orchestrates one operation per call; cheap to clone and share across tasks.
#[derive(Clone)]
pub struct RequestPipeline {
    storage: WorkingStorage,
    audit: AuditSink,
    codecs: FormatCodecs,
    metrics: Metrics,
}

impl RequestPipeline {
    /// Assemble the pipeline from its collaborators.
    #[must_use]
    pub const fn new(
        storage: WorkingStorage,
        audit: AuditSink,
        codecs: FormatCodecs,
        metrics: Metrics,
    ) -> Self {
        Self {
            storage,
            audit,
            codecs,
            metrics,
        }
    }

    /// Working storage the pipeline stages into.
    #[must_use]
    pub const fn storage(&self) -> &WorkingStorage {
        &self.storage
    }

    /// Wait for audit inserts still running in the background.
    pub async fn drain_audit(&self) {
        self.audit.drain().await;
    }

    /// Run one operation to completion.
    ///
    /// The audit insert is dispatched exactly once, after the outcome is
    /// known. It is not awaited and never changes that outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessingError`] when the artifact could not be produced.
    pub async fn execute(&self, request: OperationRequest) -> Result<Artifact, ProcessingError> {
        let received_at = Utc::now();
        let kind = request.kind();
        let mut archived = ArchiveRef::none();

        let (description, outcome) = match request {
            OperationRequest::ConvertImage { upload } => (
                IMAGE_DESCRIPTION.to_string(),
                self.convert_image(upload, &mut archived).await,
            ),
            OperationRequest::GenerateQr { text } => {
                let text = text.unwrap_or_default();
                (format!("URL: {text}"), self.generate_qr(text).await)
            }
            OperationRequest::MergePdfs { uploads } => (
                format!("Merged {} files", uploads.len()),
                self.merge_pdfs(&uploads, &mut archived).await,
            ),
            OperationRequest::CompressImage { upload } => (
                IMAGE_DESCRIPTION.to_string(),
                self.compress_image(upload, &mut archived).await,
            ),
            OperationRequest::Unreadable { operation, detail } => (
                fieldless_description(operation),
                Err(StepError::UnreadableBody { detail }),
            ),
        };

        self.finish(kind, received_at, description, archived, outcome)
    }

    async fn convert_image(
        &self,
        upload: Option<Upload>,
        archived: &mut ArchiveRef,
    ) -> Result<Artifact, StepError> {
        let upload = upload.ok_or(StepError::MissingField { field: "file" })?;
        archived.push(self.archive(&upload).await);

        let staged = self
            .run_step(
                StepKind::Stage,
                self.storage.stage(upload.declared_name(), &upload.bytes),
            )
            .await?;
        let input = self
            .run_step(StepKind::Load, self.storage.read(&staged))
            .await?;
        let png = self
            .run_step(
                StepKind::Transform,
                self.transform(move |codecs| codecs.convert_image(&input)),
            )
            .await?;

        let file_name = converted_file_name(&staged.name);
        let output = self
            .run_step(StepKind::Emit, self.storage.stage(&file_name, &png))
            .await?;
        self.discard(&staged).await;
        self.discard(&output).await;

        Ok(Artifact {
            file_name,
            content_type: PNG_CONTENT_TYPE,
            disposition: Disposition::Attachment,
            bytes: png.into(),
        })
    }

    async fn generate_qr(&self, text: String) -> Result<Artifact, StepError> {
        let png = self
            .run_step(
                StepKind::Transform,
                self.transform(move |codecs| codecs.generate_qr(&text)),
            )
            .await?;
        Ok(Artifact {
            file_name: QR_FILE_NAME.to_string(),
            content_type: PNG_CONTENT_TYPE,
            disposition: Disposition::Inline,
            bytes: png.into(),
        })
    }

    async fn merge_pdfs(
        &self,
        uploads: &[Upload],
        archived: &mut ArchiveRef,
    ) -> Result<Artifact, StepError> {
        for upload in uploads {
            archived.push(self.archive(upload).await);
        }

        let mut staged = Vec::with_capacity(uploads.len());
        for upload in uploads {
            let entry = self
                .run_step(
                    StepKind::Stage,
                    self.storage.stage(upload.declared_name(), &upload.bytes),
                )
                .await?;
            staged.push(entry);
        }

        let mut documents = Vec::with_capacity(staged.len());
        for entry in &staged {
            documents.push(self.run_step(StepKind::Load, self.storage.read(entry)).await?);
        }

        let merged = self
            .run_step(
                StepKind::Transform,
                self.transform(move |codecs| codecs.merge_documents(&documents)),
            )
            .await?;
        self.run_step(
            StepKind::Emit,
            self.storage.stage(MERGED_FILE_NAME, &merged),
        )
        .await?;
        // Inputs and the merged copy stay until the janitor expires them.
        self.record_step(StepKind::Cleanup, StepStatus::Skipped);

        Ok(Artifact {
            file_name: MERGED_FILE_NAME.to_string(),
            content_type: PDF_CONTENT_TYPE,
            disposition: Disposition::Attachment,
            bytes: merged.into(),
        })
    }

    async fn compress_image(
        &self,
        upload: Option<Upload>,
        archived: &mut ArchiveRef,
    ) -> Result<Artifact, StepError> {
        let upload = upload.ok_or(StepError::MissingField { field: "file" })?;
        archived.push(self.archive(&upload).await);

        let input = upload.bytes;
        let jpeg = self
            .run_step(
                StepKind::Transform,
                self.transform(move |codecs| codecs.compress_image(&input)),
            )
            .await?;
        Ok(Artifact {
            file_name: COMPRESSED_FILE_NAME.to_string(),
            content_type: JPEG_CONTENT_TYPE,
            disposition: Disposition::Inline,
            bytes: jpeg.into(),
        })
    }

    fn finish(
        &self,
        kind: OperationKind,
        received_at: DateTime<Utc>,
        description: String,
        archived: ArchiveRef,
        outcome: Result<Artifact, StepError>,
    ) -> Result<Artifact, ProcessingError> {
        self.audit.dispatch(AuditRecord {
            timestamp: received_at,
            kind,
            description,
            archived,
        });

        let request_id = current_request_id().unwrap_or_default();
        match outcome {
            Ok(artifact) => {
                self.metrics.inc_operation(kind.as_str(), "success");
                info!(
                    operation = kind.as_str(),
                    request_id = %request_id,
                    file_name = %artifact.file_name,
                    bytes = artifact.bytes.len(),
                    "operation completed"
                );
                Ok(artifact)
            }
            Err(err) => {
                let failure = ProcessingError::from_step(kind, &err);
                self.metrics.inc_operation(kind.as_str(), "failure");
                warn!(
                    operation = kind.as_str(),
                    request_id = %request_id,
                    error = %failure.detail,
                    "operation failed"
                );
                Err(failure)
            }
        }
    }

    async fn archive(&self, upload: &Upload) -> Option<String> {
        if upload.file_name.as_deref().is_none_or(str::is_empty) {
            self.record_step(StepKind::Archive, StepStatus::Skipped);
            return None;
        }
        let archived = self
            .audit
            .snapshot(upload.declared_name(), &upload.bytes)
            .await;
        let status = if archived.is_some() {
            StepStatus::Completed
        } else {
            StepStatus::Failed
        };
        self.record_step(StepKind::Archive, status);
        archived
    }

    async fn transform<F>(&self, job: F) -> Result<Vec<u8>, StepError>
    where
        F: FnOnce(FormatCodecs) -> CodecResult<Vec<u8>> + Send + 'static,
    {
        let codecs = self.codecs;
        let output = tokio::task::spawn_blocking(move || job(codecs))
            .await
            .map_err(|source| StepError::Blocking { source })??;
        Ok(output)
    }

    async fn run_step<T, E, F>(&self, step: StepKind, work: F) -> Result<T, StepError>
    where
        F: Future<Output = Result<T, E>>,
        StepError: From<E>,
    {
        match work.await {
            Ok(value) => {
                self.record_step(step, StepStatus::Completed);
                Ok(value)
            }
            Err(err) => {
                self.record_step(step, StepStatus::Failed);
                Err(StepError::from(err))
            }
        }
    }

    async fn discard(&self, entry: &StagedEntry) {
        if let Err(err) = self.storage.remove(entry).await {
            warn!(error = %err, path = %entry.path.display(), "working entry left for janitor");
            self.record_step(StepKind::Cleanup, StepStatus::Failed);
            return;
        }
        self.record_step(StepKind::Cleanup, StepStatus::Completed);
    }

    fn record_step(&self, step: StepKind, status: StepStatus) {
        debug!(step = step.as_str(), status = status.as_str(), "pipeline step");
        self.metrics
            .inc_pipeline_step(step.as_str(), status.as_str());
    }
}
