//! Synthetic content for codec, pipeline and HTTP tests.
//!
//! Every builder is deterministic so tests can compare outputs byte for byte.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use lopdf::{Dictionary, Document, Object, ObjectId};

/// Height shared by every synthetic PDF page, in points.
pub const PAGE_HEIGHT: i64 = 792;

/// Opaque RGB gradient encoded as PNG.
#[must_use]
pub fn png_rgb(width: u32, height: u32) -> Vec<u8> {
    let buffer = RgbImage::from_fn(width, height, |x, y| {
        Rgb([channel(x * 255, width), channel(y * 255, height), 128])
    });
    encode_png(DynamicImage::ImageRgb8(buffer))
}

/// RGBA gradient with varying transparency encoded as PNG.
#[must_use]
pub fn png_rgba(width: u32, height: u32) -> Vec<u8> {
    let buffer = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            channel(x * 255, width),
            64,
            channel(y * 255, height),
            channel((x + y) * 255, width + height),
        ])
    });
    encode_png(DynamicImage::ImageRgba8(buffer))
}

/// Four-colour palette image encoded as an indexed PNG.
#[must_use]
pub fn png_indexed(width: u32, height: u32) -> Vec<u8> {
    let indices = (0..height)
        .flat_map(|y| (0..width).map(move |x| u8::try_from((x + y) % 4).unwrap_or(0)))
        .collect::<Vec<_>>();

    let mut output = Vec::new();
    let mut encoder = png::Encoder::new(&mut output, width, height);
    encoder.set_color(png::ColorType::Indexed);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_palette(vec![0, 0, 0, 255, 0, 0, 0, 255, 0, 0, 0, 255]);
    let mut writer = encoder.write_header().expect("png header");
    writer.write_image_data(&indices).expect("png data");
    writer.finish().expect("png finish");
    output
}

/// High-entropy RGB image encoded as PNG, useful for comparing encoder quality levels.
#[must_use]
pub fn png_noise(width: u32, height: u32) -> Vec<u8> {
    let mut state: u32 = 0x9E37_79B9;
    let buffer = RgbImage::from_fn(width, height, |_, _| {
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state.to_le_bytes()[0]
        };
        Rgb([next(), next(), next()])
    });
    encode_png(DynamicImage::ImageRgb8(buffer))
}

/// PDF with one page per entry in `widths`, each carrying its own `MediaBox`.
#[must_use]
pub fn sample_pdf(widths: &[i64]) -> Vec<u8> {
    build_pdf(widths, None)
}

/// PDF with `pages` pages that inherit a shared `MediaBox` from the page tree.
#[must_use]
pub fn sample_pdf_inherited_media_box(width: i64, pages: usize) -> Vec<u8> {
    build_pdf(&vec![width; pages], Some(width))
}

fn build_pdf(widths: &[i64], inherited_width: Option<i64>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let tree_id = doc.new_object_id();

    let kids = widths
        .iter()
        .map(|width| {
            let mut page = Dictionary::new();
            page.set("Type", Object::Name(b"Page".to_vec()));
            page.set("Parent", Object::Reference(tree_id));
            if inherited_width.is_none() {
                page.set("MediaBox", media_box(*width));
            }
            Object::Reference(doc.add_object(Object::Dictionary(page)))
        })
        .collect::<Vec<_>>();

    let mut tree = Dictionary::new();
    tree.set("Type", Object::Name(b"Pages".to_vec()));
    tree.set(
        "Count",
        Object::Integer(i64::try_from(kids.len()).unwrap_or(0)),
    );
    tree.set("Kids", Object::Array(kids));
    if let Some(width) = inherited_width {
        tree.set("MediaBox", media_box(width));
    }
    doc.objects.insert(tree_id, Object::Dictionary(tree));

    let catalog_id = add_catalog(&mut doc, tree_id);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut output = Vec::new();
    doc.save_to(&mut output).expect("pdf save");
    output
}

fn add_catalog(doc: &mut Document, tree_id: ObjectId) -> ObjectId {
    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(tree_id));
    doc.add_object(Object::Dictionary(catalog))
}

fn media_box(width: i64) -> Object {
    Object::Array(vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Integer(width),
        Object::Integer(PAGE_HEIGHT),
    ])
}

fn channel(numerator: u32, denominator: u32) -> u8 {
    u8::try_from(numerator / denominator.max(1)).unwrap_or(u8::MAX)
}

fn encode_png(image: DynamicImage) -> Vec<u8> {
    let mut output = Cursor::new(Vec::new());
    image
        .write_to(&mut output, ImageFormat::Png)
        .expect("png encode");
    output.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_fixtures_decode_with_expected_layout() {
        let rgb = image::load_from_memory(&png_rgb(4, 3)).expect("rgb");
        assert_eq!(rgb.color(), image::ColorType::Rgb8);
        assert_eq!((rgb.width(), rgb.height()), (4, 3));

        let rgba = image::load_from_memory(&png_rgba(4, 3)).expect("rgba");
        assert_eq!(rgba.color(), image::ColorType::Rgba8);

        let indexed = image::load_from_memory(&png_indexed(4, 3)).expect("indexed");
        assert_eq!((indexed.width(), indexed.height()), (4, 3));
    }

    #[test]
    fn pdf_fixture_has_requested_pages() {
        let doc = Document::load_mem(&sample_pdf(&[100, 200, 300])).expect("pdf");
        assert_eq!(doc.get_pages().len(), 3);

        let inherited =
            Document::load_mem(&sample_pdf_inherited_media_box(50, 2)).expect("pdf");
        assert_eq!(inherited.get_pages().len(), 2);
    }
}
