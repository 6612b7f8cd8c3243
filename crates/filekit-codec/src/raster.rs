//! Raster image conversion and compression.

use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageError, ImageFormat, ImageReader};
use tracing::debug;

use crate::error::{CodecError, CodecResult};
use crate::heif::{decode_heif, is_heif};

/// Extension given to converted images.
const PNG_EXTENSION: &str = "png";

/// Decode `input` (format sniffed from content, HEIF included) and re-encode
/// it as PNG.
///
/// Float-sample images are narrowed to 8-bit RGBA first because PNG has no
/// floating point representation; every other layout is written unchanged.
///
/// # Errors
///
/// Returns [`CodecError::ImageDecode`] for unrecognised or corrupt input and
/// [`CodecError::ImageEncode`] if the PNG writer fails.
pub fn convert_to_png(input: &[u8]) -> CodecResult<Vec<u8>> {
    let decoded = decode(input)?;
    let image = match decoded {
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
            DynamicImage::ImageRgba8(decoded.to_rgba8())
        }
        other => other,
    };

    let mut output = Cursor::new(Vec::new());
    image
        .write_to(&mut output, ImageFormat::Png)
        .map_err(|source| CodecError::ImageEncode {
            target: "png",
            source,
        })?;
    Ok(output.into_inner())
}

/// Decode `input`, flatten it to three-channel RGB and re-encode it as JPEG.
///
/// Alpha is dropped without compositing and palette images are expanded.
///
/// # Errors
///
/// Returns [`CodecError::ImageDecode`] for unrecognised or corrupt input and
/// [`CodecError::ImageEncode`] if the JPEG writer fails.
pub fn compress_to_jpeg(input: &[u8], quality: u8) -> CodecResult<Vec<u8>> {
    let decoded = decode(input)?;
    let rgb = match decoded {
        DynamicImage::ImageRgb8(buffer) => buffer,
        other => other.to_rgb8(),
    };

    let mut output = Vec::new();
    JpegEncoder::new_with_quality(&mut output, quality)
        .encode_image(&rgb)
        .map_err(|source| CodecError::ImageEncode {
            target: "jpeg",
            source,
        })?;
    Ok(output)
}

/// Name of a converted image: the original base name with a `.png` extension.
///
/// Only the last extension is replaced, so `archive.tar.heic` becomes
/// `archive.tar.png` and a name without an extension gains one.
#[must_use]
pub fn converted_file_name(original: &str) -> String {
    let stem = Path::new(original)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(original);
    format!("{stem}.{PNG_EXTENSION}")
}

fn decode(input: &[u8]) -> CodecResult<DynamicImage> {
    if is_heif(input) {
        debug!(bytes = input.len(), "decoding heif image");
        return decode_heif(input);
    }
    let reader = ImageReader::new(Cursor::new(input))
        .with_guessed_format()
        .map_err(|err| CodecError::ImageDecode {
            source: ImageError::IoError(err),
        })?;
    debug!(format = ?reader.format(), bytes = input.len(), "decoding image");
    reader
        .decode()
        .map_err(|source| CodecError::ImageDecode { source })
}
