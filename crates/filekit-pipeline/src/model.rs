//! Request and response types for the pipeline.

use bytes::Bytes;
use filekit_audit::OperationKind;

/// One uploaded content stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    /// File name declared by the caller, if any.
    pub file_name: Option<String>,
    /// Content exactly as received.
    pub bytes: Bytes,
}

impl Upload {
    /// Upload with a declared file name.
    #[must_use]
    pub fn named(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: Some(file_name.into()),
            bytes: bytes.into(),
        }
    }

    pub(crate) fn declared_name(&self) -> &str {
        self.file_name.as_deref().unwrap_or_default()
    }
}

/// A single inbound operation.
#[derive(Debug, Clone)]
pub enum OperationRequest {
    /// Convert an image to PNG.
    ConvertImage {
        /// The `file` field, absent when the caller omitted it.
        upload: Option<Upload>,
    },
    /// Render text as a QR symbol.
    GenerateQr {
        /// The `text` field, absent when the caller omitted it.
        text: Option<String>,
    },
    /// Concatenate PDFs in submission order.
    MergePdfs {
        /// The `files` fields in the order received.
        uploads: Vec<Upload>,
    },
    /// Re-encode an image as JPEG.
    CompressImage {
        /// The `file` field, absent when the caller omitted it.
        upload: Option<Upload>,
    },
    /// A request whose form body broke before its fields could be read.
    Unreadable {
        /// Operation the caller addressed.
        operation: OperationKind,
        /// Why the body could not be read.
        detail: String,
    },
}

impl OperationRequest {
    /// Kind recorded for this request.
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        match self {
            Self::ConvertImage { .. } => OperationKind::ImageConvert,
            Self::GenerateQr { .. } => OperationKind::QrGenerate,
            Self::MergePdfs { .. } => OperationKind::PdfMerge,
            Self::CompressImage { .. } => OperationKind::ImageCompress,
            Self::Unreadable { operation, .. } => *operation,
        }
    }
}

/// How the client should present the artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Offer as a download.
    Attachment,
    /// Display in place.
    Inline,
}

impl Disposition {
    /// `Content-Disposition` header value for `file_name`.
    ///
    /// The quoted `filename` is always ASCII. Names with other characters
    /// also get an RFC 5987 `filename*` parameter carrying the UTF-8 name.
    #[must_use]
    pub fn header_value(self, file_name: &str) -> String {
        let kind = match self {
            Self::Attachment => "attachment",
            Self::Inline => "inline",
        };
        let fallback = file_name
            .chars()
            .filter(char::is_ascii)
            .map(|c| if c.is_ascii_control() || c == '"' || c == '\\' { '_' } else { c })
            .collect::<String>();
        if file_name.is_ascii() {
            return format!("{kind}; filename=\"{fallback}\"");
        }
        let encoded = urlencoding::encode(file_name);
        format!("{kind}; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
    }
}

/// Result returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Suggested download name.
    pub file_name: String,
    /// MIME type of `bytes`.
    pub content_type: &'static str,
    /// Presentation hint.
    pub disposition: Disposition,
    /// Encoded output.
    pub bytes: Bytes,
}
