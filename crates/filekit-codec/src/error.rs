//! Error types for the format codecs.

use thiserror::Error;

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Failures raised while decoding or encoding content.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Input bytes could not be decoded as an image.
    #[error("failed to decode image")]
    ImageDecode {
        /// Underlying image error.
        #[source]
        source: image::ImageError,
    },
    /// The input is HEIF but this build has no HEIF decoder.
    #[error("heif decoding is not enabled in this build")]
    HeifUnsupported,
    /// libheif rejected the input.
    #[cfg(feature = "heic")]
    #[error("failed to decode heif image")]
    HeifDecode {
        /// Decoder stage that failed.
        stage: &'static str,
        /// Underlying libheif error.
        #[source]
        source: libheif_rs::HeifError,
    },
    /// The decoded HEIF plane did not have the requested RGBA layout.
    #[error("unexpected heif pixel layout")]
    HeifLayout,
    /// The decoded image could not be written in the target format.
    #[error("failed to encode image")]
    ImageEncode {
        /// Target format name.
        target: &'static str,
        /// Underlying image error.
        #[source]
        source: image::ImageError,
    },
    /// The QR encoder rejected the payload.
    #[error("failed to encode qr symbol")]
    Qr {
        /// Underlying encoder error.
        #[source]
        source: qrcode::types::QrError,
    },
    /// A PDF input could not be parsed.
    #[error("failed to read pdf document")]
    PdfRead {
        /// Zero-based position of the document in the merge order.
        index: usize,
        /// Underlying parser error.
        #[source]
        source: lopdf::Error,
    },
    /// A PDF input lacked an object the merge depends on.
    #[error("pdf document is missing required structure")]
    PdfStructure {
        /// Missing object description.
        missing: &'static str,
    },
    /// Writing the merged document failed.
    #[error("failed to write merged pdf")]
    PdfWrite {
        /// Rendered writer failure.
        detail: String,
    },
    /// A merge was requested with no documents.
    #[error("no documents to merge")]
    EmptyMerge,
}
