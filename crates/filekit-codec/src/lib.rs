#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, unreachable_pub)]

//! Stateless format codecs used by the request pipeline.
//!
//! Every codec takes bytes in and returns bytes out; none of them touch the
//! filesystem or share state, so they are safe to run on blocking threads in
//! parallel.

pub mod error;
pub mod heif;
pub mod raster;
pub mod pdf;
pub mod qr;

pub use error::{CodecError, CodecResult};
pub use heif::is_heif;
pub use raster::{compress_to_jpeg, convert_to_png, converted_file_name};
pub use pdf::merge_pdfs;
pub use qr::render_qr_png;

use filekit_config::CodecSettings;

/// MIME type of PNG output.
pub const PNG_CONTENT_TYPE: &str = "image/png";
/// MIME type of JPEG output.
pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";
/// MIME type of PDF output.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Codec facade carrying the fixed encoder settings.
#[derive(Debug, Clone, Copy)]
pub struct FormatCodecs {
    settings: CodecSettings,
}

impl FormatCodecs {
    /// Construct the facade from configuration.
    #[must_use]
    pub const fn new(settings: CodecSettings) -> Self {
        Self { settings }
    }

    /// Settings the codecs were built with.
    #[must_use]
    pub const fn settings(&self) -> CodecSettings {
        self.settings
    }

    /// Decode any supported raster image and re-encode it as PNG.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be decoded or the PNG cannot be written.
    pub fn convert_image(&self, input: &[u8]) -> CodecResult<Vec<u8>> {
        convert_to_png(input)
    }

    /// Render `text` as a QR symbol in PNG form.
    ///
    /// # Errors
    ///
    /// Returns an error if the text does not fit in a QR symbol.
    pub fn generate_qr(&self, text: &str) -> CodecResult<Vec<u8>> {
        render_qr_png(text, self.settings.qr_module_px)
    }

    /// Concatenate the pages of `documents` in order.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty input list or any unreadable document.
    pub fn merge_documents<D>(&self, documents: &[D]) -> CodecResult<Vec<u8>>
    where
        D: AsRef<[u8]>,
    {
        merge_pdfs(documents)
    }

    /// Flatten to three-channel RGB and re-encode as JPEG at the configured quality.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be decoded or the JPEG cannot be written.
    pub fn compress_image(&self, input: &[u8]) -> CodecResult<Vec<u8>> {
        compress_to_jpeg(input, self.settings.jpeg_quality)
    }
}
