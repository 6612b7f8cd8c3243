//! PDF page concatenation.
//!
//! Each input is renumbered into a disjoint object-id range, its pages are
//! collected in page order and re-parented under a single page tree, and the
//! first catalog is kept as the document root. Inheritable page attributes
//! are copied onto each page before its original ancestors are dropped.

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use crate::error::{CodecError, CodecResult};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Upper bound on page-tree depth followed while resolving inheritance.
const MAX_TREE_DEPTH: usize = 64;

/// Concatenate the pages of `documents` in submission order.
///
/// # Errors
///
/// Returns [`CodecError::EmptyMerge`] for an empty list,
/// [`CodecError::PdfRead`] naming the first unreadable input,
/// [`CodecError::PdfStructure`] when no page tree or catalog is present, and
/// [`CodecError::PdfWrite`] if serialisation fails.
pub fn merge_pdfs<D>(documents: &[D]) -> CodecResult<Vec<u8>>
where
    D: AsRef<[u8]>,
{
    if documents.is_empty() {
        return Err(CodecError::EmptyMerge);
    }

    let mut next_id = 1;
    let mut pages: Vec<(ObjectId, Dictionary)> = Vec::new();
    let mut objects = std::collections::BTreeMap::new();

    for (index, bytes) in documents.iter().enumerate() {
        let mut doc = Document::load_mem(bytes.as_ref())
            .map_err(|source| CodecError::PdfRead { index, source })?;
        doc.renumber_objects_with(next_id);
        next_id = doc.max_id + 1;

        for page_id in doc.get_pages().into_values() {
            if let Some(page) = flattened_page(&doc, page_id) {
                pages.push((page_id, page));
            }
        }
        debug!(index, pages = pages.len(), "collected pdf pages");
        objects.extend(doc.objects);
    }

    let mut merged = Document::with_version("1.5");
    let mut catalog: Option<(ObjectId, Dictionary)> = None;
    let mut page_tree: Option<(ObjectId, Dictionary)> = None;

    for (object_id, object) in objects {
        let kind = object.type_name().unwrap_or_default().to_owned();
        match kind.as_str() {
            "Catalog" => {
                if catalog.is_none() {
                    if let Ok(dictionary) = object.as_dict() {
                        catalog = Some((object_id, dictionary.clone()));
                    }
                }
            }
            "Pages" => {
                if page_tree.is_none() {
                    if let Ok(dictionary) = object.as_dict() {
                        page_tree = Some((object_id, dictionary.clone()));
                    }
                }
            }
            "Page" | "Outlines" | "Outline" => {}
            _ => {
                merged.objects.insert(object_id, object);
            }
        }
    }

    let (tree_id, mut tree) = page_tree.ok_or(CodecError::PdfStructure {
        missing: "page tree",
    })?;
    let (catalog_id, mut root) = catalog.ok_or(CodecError::PdfStructure {
        missing: "document catalog",
    })?;

    let count = i64::try_from(pages.len()).unwrap_or(i64::MAX);
    let kids = pages
        .iter()
        .map(|(page_id, _)| Object::Reference(*page_id))
        .collect::<Vec<_>>();
    for (page_id, mut page) in pages {
        page.set("Parent", Object::Reference(tree_id));
        merged.objects.insert(page_id, Object::Dictionary(page));
    }

    tree.remove(b"Parent");
    tree.set("Kids", Object::Array(kids));
    tree.set("Count", Object::Integer(count));
    merged.objects.insert(tree_id, Object::Dictionary(tree));

    root.set("Pages", Object::Reference(tree_id));
    root.remove(b"Outlines");
    merged.objects.insert(catalog_id, Object::Dictionary(root));

    merged.trailer.set("Root", Object::Reference(catalog_id));
    merged.max_id = next_id;
    merged.renumber_objects();
    merged.compress();

    let mut output = Vec::new();
    merged
        .save_to(&mut output)
        .map_err(|err| CodecError::PdfWrite {
            detail: err.to_string(),
        })?;
    Ok(output)
}

/// Clone a page dictionary with inherited attributes made explicit.
fn flattened_page(doc: &Document, page_id: ObjectId) -> Option<Dictionary> {
    let mut page = doc.get_object(page_id).ok()?.as_dict().ok()?.clone();

    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    for _ in 0..MAX_TREE_DEPTH {
        let Some(ancestor_id) = parent else {
            break;
        };
        let Some(ancestor) = doc
            .get_object(ancestor_id)
            .ok()
            .and_then(|object| object.as_dict().ok())
        else {
            break;
        };
        for key in INHERITABLE {
            if !page.has(key) {
                if let Ok(value) = ancestor.get(key) {
                    page.set(key, value.clone());
                }
            }
        }
        parent = ancestor.get(b"Parent").and_then(Object::as_reference).ok();
    }
    Some(page)
}
