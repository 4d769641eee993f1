//! Source document handling.

use std::path::Path;

use lopdf::{Document as LopdfDocument, Object, ObjectId};

use crate::detect::{detect_format_from_bytes, PdfFormat};
use crate::error::{Error, Result};

use super::PageSize;

/// Maximum depth when walking the page tree for inherited attributes.
const MAX_INHERIT_DEPTH: usize = 16;

/// An input PDF, immutable once loaded.
///
/// Keeps the original bytes for rasterizer backends and the parsed object
/// graph for the merger. Pages are addressed by 0-based index.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    bytes: Vec<u8>,
    pdf: LopdfDocument,
    format: PdfFormat,
    page_ids: Vec<ObjectId>,
}

impl SourceDocument {
    /// Open a PDF file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(data)
    }

    /// Load a PDF from bytes.
    ///
    /// Any structural problem is reported as [`Error::DocumentFormat`],
    /// which aborts the run: without every page there is nothing
    /// meaningful to produce.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = data.into();
        let format = detect_format_from_bytes(&bytes)?;

        let pdf = LopdfDocument::load_mem(&bytes)
            .map_err(|e| Error::DocumentFormat(format!("failed to parse PDF: {}", e)))?;

        if pdf.is_encrypted() {
            return Err(Error::DocumentFormat("document is encrypted".to_string()));
        }

        // get_pages() is keyed by 1-based page number, already in order
        let page_ids: Vec<ObjectId> = pdf.get_pages().into_values().collect();

        log::debug!(
            "Loaded {} with {} page(s) ({} bytes)",
            format,
            page_ids.len(),
            bytes.len()
        );

        Ok(Self {
            bytes,
            pdf,
            format,
            page_ids,
        })
    }

    /// Original document bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Parsed object graph.
    pub fn pdf(&self) -> &LopdfDocument {
        &self.pdf
    }

    /// Detected PDF header information.
    pub fn format(&self) -> &PdfFormat {
        &self.format
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Object id of the page at `index`.
    pub fn page_id(&self, index: usize) -> Result<ObjectId> {
        self.page_ids
            .get(index)
            .copied()
            .ok_or(Error::PageOutOfRange(index, self.page_ids.len()))
    }

    /// Page size from the (possibly inherited) MediaBox.
    ///
    /// Falls back to A4 when the page carries no usable MediaBox.
    pub fn page_size(&self, index: usize) -> Result<PageSize> {
        let page_id = self.page_id(index)?;
        Ok(page_media_box(&self.pdf, page_id)
            .map(|[x0, y0, x1, y1]| PageSize::new((x1 - x0).abs(), (y1 - y0).abs()))
            .unwrap_or_default())
    }
}

/// Resolve a page's MediaBox, following `Parent` links for inherited values.
pub(crate) fn page_media_box(doc: &LopdfDocument, page_id: ObjectId) -> Option<[f32; 4]> {
    let media_box = inherited(doc, page_id, b"MediaBox")?;
    let array = resolve(doc, media_box).ok()?.as_array().ok()?;
    if array.len() < 4 {
        return None;
    }
    let mut values = [0.0f32; 4];
    for (slot, obj) in values.iter_mut().zip(array.iter()) {
        *slot = obj.as_float().ok()?;
    }
    Some(values)
}

/// Look up a page attribute, following `Parent` links for inherited values.
pub(crate) fn inherited<'a>(
    doc: &'a LopdfDocument,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_INHERIT_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

pub(crate) fn resolve<'a>(doc: &'a LopdfDocument, object: &'a Object) -> Result<&'a Object> {
    match object {
        Object::Reference(id) => Ok(doc.get_object(*id)?),
        other => Ok(other),
    }
}
