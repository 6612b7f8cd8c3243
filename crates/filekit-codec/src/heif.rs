//! HEIF container detection and, with the `heic` feature, decoding.
//!
//! HEIF files are ISO base media files whose leading `ftyp` box names a
//! HEIF brand, either as the major brand or among the compatible ones.

use image::DynamicImage;

use crate::error::{CodecError, CodecResult};

/// Major brands that always mean a HEIF still image or sequence.
const HEIF_BRANDS: [&[u8; 4]; 10] = [
    b"heic", b"heix", b"heim", b"heis", b"hevc", b"hevx", b"hevm", b"hevs", b"mif1", b"msf1",
];
/// AVIF shares the container and lists `mif1`, but `image` handles it.
const AVIF_BRANDS: [&[u8; 4]; 2] = [b"avif", b"avis"];

/// Whether `input` starts with an `ftyp` box carrying a HEIF brand.
#[must_use]
pub fn is_heif(input: &[u8]) -> bool {
    let Some(header) = input.get(..12) else {
        return false;
    };
    if &header[4..8] != b"ftyp" {
        return false;
    }
    let major = &header[8..12];
    if AVIF_BRANDS.iter().any(|brand| major == brand.as_slice()) {
        return false;
    }
    if HEIF_BRANDS.iter().any(|brand| major == brand.as_slice()) {
        return true;
    }

    let declared = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
    let box_len = usize::try_from(declared).unwrap_or(usize::MAX).min(input.len());
    // 12 bytes of header, 4 bytes of minor version, then compatible brands.
    input
        .get(16..box_len)
        .unwrap_or_default()
        .chunks_exact(4)
        .any(|brand| HEIF_BRANDS.iter().any(|known| brand == known.as_slice()))
}

/// Decode the primary image of a HEIF file to 8-bit RGBA.
///
/// # Errors
///
/// Returns [`CodecError::HeifDecode`] when libheif rejects the input and
/// [`CodecError::HeifLayout`] when the decoded plane is not the expected
/// interleaved RGBA layout.
#[cfg(feature = "heic")]
pub fn decode_heif(input: &[u8]) -> CodecResult<DynamicImage> {
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    let lib = LibHeif::new();
    let context = HeifContext::read_from_bytes(input).map_err(heif_error("read"))?;
    let handle = context.primary_image_handle().map_err(heif_error("primary_image"))?;
    let decoded = lib
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgba), None)
        .map_err(heif_error("decode"))?;

    let planes = decoded.planes();
    let plane = planes.interleaved.ok_or(CodecError::HeifLayout)?;
    let (width, height) = (plane.width, plane.height);
    let row = usize::try_from(width).map_err(|_| CodecError::HeifLayout)? * 4;
    let rows = usize::try_from(height).map_err(|_| CodecError::HeifLayout)?;
    if plane.stride < row {
        return Err(CodecError::HeifLayout);
    }

    let mut pixels = Vec::with_capacity(row * rows);
    for line in plane.data.chunks(plane.stride).take(rows) {
        pixels.extend_from_slice(line.get(..row).ok_or(CodecError::HeifLayout)?);
    }
    image::RgbaImage::from_raw(width, height, pixels)
        .map(DynamicImage::ImageRgba8)
        .ok_or(CodecError::HeifLayout)
}

#[cfg(feature = "heic")]
fn heif_error(stage: &'static str) -> impl FnOnce(libheif_rs::HeifError) -> CodecError {
    move |source| CodecError::HeifDecode { stage, source }
}

/// Builds without the `heic` feature recognise HEIF input but cannot decode it.
///
/// # Errors
///
/// Always returns [`CodecError::HeifUnsupported`].
#[cfg(not(feature = "heic"))]
pub const fn decode_heif(_input: &[u8]) -> CodecResult<DynamicImage> {
    Err(CodecError::HeifUnsupported)
}
