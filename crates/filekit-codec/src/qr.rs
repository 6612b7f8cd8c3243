//! QR symbol rendering.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Luma};
use qrcode::QrCode;

use crate::error::{CodecError, CodecResult};

/// Encode `text` as a QR symbol and render it as a grayscale PNG.
///
/// Error correction level and version are left to the encoder's automatic
/// choice; each module is `module_px` pixels square and the standard quiet
/// zone is included. Empty text is a valid payload.
///
/// # Errors
///
/// Returns [`CodecError::Qr`] when the payload exceeds symbol capacity and
/// [`CodecError::ImageEncode`] if the PNG writer fails.
pub fn render_qr_png(text: &str, module_px: u32) -> CodecResult<Vec<u8>> {
    let code = QrCode::new(text.as_bytes()).map_err(|source| CodecError::Qr { source })?;
    let symbol = code
        .render::<Luma<u8>>()
        .module_dimensions(module_px, module_px)
        .quiet_zone(true)
        .build();

    let mut output = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(symbol)
        .write_to(&mut output, ImageFormat::Png)
        .map_err(|source| CodecError::ImageEncode {
            target: "png",
            source,
        })?;
    Ok(output.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendering_is_deterministic() -> anyhow::Result<()> {
        let first = render_qr_png("https://example.com", 10)?;
        let second = render_qr_png("https://example.com", 10)?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn module_size_scales_output() -> anyhow::Result<()> {
        let small = image::load_from_memory(&render_qr_png("hello", 2)?)?;
        let large = image::load_from_memory(&render_qr_png("hello", 10)?)?;
        assert_eq!(large.width(), small.width() * 5);
        assert_eq!(large.width(), large.height());
        Ok(())
    }

    #[test]
    fn empty_text_still_renders() -> anyhow::Result<()> {
        let png = render_qr_png("", 10)?;
        let decoded = image::load_from_memory(&png)?;
        assert!(decoded.width() > 0);
        Ok(())
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let text = "x".repeat(8_000);
        assert!(matches!(
            render_qr_png(&text, 10),
            Err(CodecError::Qr { .. })
        ));
    }
}
