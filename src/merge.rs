//! Merging overlay pages onto source pages.
//!
//! Each overlay is parsed back as a single-page PDF. Its fonts are
//! imported into the source document under fresh resource names and its
//! content is appended after the page's own content, which is wrapped in
//! `q ... Q` so the overlay starts from a clean graphics state and draws
//! on top. Nothing else on the page changes.
//!
//! A broken overlay only affects its own page: the page is left as it was
//! and an [`PageWarning::OverlayMergeDefect`] is reported.

use std::collections::{BTreeMap, HashMap};

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::error::{Error, Result};
use crate::model::{inherited, page_media_box, resolve, SourceDocument};
use crate::options::OverlayPlacement;
use crate::report::PageWarning;

/// Prefix of the resource names imported overlay fonts are given.
const FONT_PREFIX: &str = "OvF";

/// Result of merging overlays into a document.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// The output document
    pub bytes: Vec<u8>,
    /// Pages that received their overlay, ascending
    pub applied: Vec<usize>,
    /// One warning per overlay that could not be merged
    pub warnings: Vec<PageWarning>,
}

/// Merges overlay pages onto the pages of a [`SourceDocument`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentMerger {
    placement: OverlayPlacement,
}

impl DocumentMerger {
    pub fn new(placement: OverlayPlacement) -> Self {
        Self { placement }
    }

    /// Merge `overlays` (page index to overlay PDF bytes) in ascending
    /// page order.
    ///
    /// Page count and order of the output always equal the source. When no
    /// overlay could be applied the source bytes are returned unchanged.
    pub fn merge(
        &self,
        source: &SourceDocument,
        overlays: &BTreeMap<usize, Vec<u8>>,
    ) -> Result<MergeOutcome> {
        let mut doc = source.pdf().clone();
        let mut applied = Vec::new();
        let mut warnings = Vec::new();

        for (&page, bytes) in overlays {
            let page_id = source.page_id(page)?;
            let result = PreparedOverlay::parse(bytes)
                .and_then(|overlay| self.apply(&mut doc, page_id, overlay));

            match result {
                Ok(()) => {
                    log::debug!("Page {}: overlay merged", page);
                    applied.push(page);
                }
                Err(e) => {
                    let warning = PageWarning::OverlayMergeDefect {
                        page,
                        reason: e.to_string(),
                    };
                    log::warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        if applied.is_empty() {
            return Ok(MergeOutcome {
                bytes: source.bytes().to_vec(),
                applied,
                warnings,
            });
        }

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;

        Ok(MergeOutcome {
            bytes,
            applied,
            warnings,
        })
    }

    fn apply(&self, doc: &mut Document, page_id: ObjectId, overlay: PreparedOverlay) -> Result<()> {
        let page = doc.get_dictionary(page_id)?;
        // Contents is a stream, an array of streams, or a reference to either
        let original = match page.get(b"Contents") {
            Ok(Object::Reference(id)) => match doc.get_object(*id)? {
                Object::Array(items) => items.clone(),
                _ => vec![Object::Reference(*id)],
            },
            Ok(Object::Array(items)) => items.clone(),
            _ => Vec::new(),
        };

        // Resources may be shared with other pages: always work on a copy
        let mut resources = match inherited(doc, page_id, b"Resources") {
            Some(obj) => resolve(doc, obj)?.as_dict()?.clone(),
            None => Dictionary::new(),
        };
        let mut fonts = match resources.get(b"Font") {
            Ok(obj) => resolve(doc, obj)?.as_dict()?.clone(),
            Err(_) => Dictionary::new(),
        };

        let mut renames: HashMap<Vec<u8>, Vec<u8>> = HashMap::new();
        let mut next = 1;
        for (name, _) in &overlay.fonts {
            let fresh = loop {
                let candidate = format!("{}{}", FONT_PREFIX, next).into_bytes();
                next += 1;
                if !fonts.has(&candidate) {
                    break candidate;
                }
            };
            renames.insert(name.clone(), fresh);
        }

        let mut operations = vec![Operation::new("Q", vec![])];
        if self.placement == OverlayPlacement::FitPage {
            if let Some(matrix) = fit_matrix(overlay.media_box, page_media_box(doc, page_id)) {
                operations.push(Operation::new(
                    "cm",
                    matrix.into_iter().map(Object::Real).collect(),
                ));
            }
        }
        for mut op in overlay.operations {
            if op.operator == "Tf" {
                if let Some(Object::Name(name)) = op.operands.first_mut() {
                    if let Some(fresh) = renames.get(name.as_slice()) {
                        *name = fresh.clone();
                    }
                }
            }
            operations.push(op);
        }
        // leading newline keeps the Q apart from content lacking trailing whitespace
        let mut overlay_content = b"\n".to_vec();
        overlay_content.extend(
            Content { operations }
                .encode()
                .map_err(|e| Error::Overlay(format!("failed to encode overlay content: {}", e)))?,
        );

        let mut imported = BTreeMap::new();
        for (name, font) in &overlay.fonts {
            let copy = import_object(doc, &overlay.doc, font, &mut imported);
            if let Some(fresh) = renames.get(name) {
                fonts.set(fresh.clone(), copy);
            }
        }
        resources.set("Font", fonts);

        let open_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let overlay_id = doc.add_object(Stream::new(Dictionary::new(), overlay_content));

        let mut parts = vec![Object::Reference(open_id)];
        parts.extend(original);
        parts.push(Object::Reference(overlay_id));

        let page = doc.get_object_mut(page_id).and_then(|obj| obj.as_dict_mut())?;
        page.set("Contents", parts);
        page.set("Resources", resources);
        Ok(())
    }
}

/// A parsed and validated overlay page.
struct PreparedOverlay {
    doc: Document,
    operations: Vec<Operation>,
    fonts: Vec<(Vec<u8>, Object)>,
    media_box: Option<[f32; 4]>,
}

impl PreparedOverlay {
    fn parse(bytes: &[u8]) -> Result<Self> {
        let doc = Document::load_mem(bytes)
            .map_err(|e| Error::Overlay(format!("unreadable overlay: {}", e)))?;

        let pages = doc.get_pages();
        let page_id = match (pages.len(), pages.values().next()) {
            (1, Some(&id)) => id,
            (count, _) => {
                return Err(Error::Overlay(format!(
                    "overlay has {} page(s), expected 1",
                    count
                )))
            }
        };

        let raw = doc
            .get_page_content(page_id)
            .map_err(|e| Error::Overlay(format!("unreadable overlay content: {}", e)))?;
        let operations = Content::decode(&raw)
            .map_err(|e| Error::Overlay(format!("unreadable overlay content: {}", e)))?
            .operations;

        let mut fonts = Vec::new();
        if let Some(resources) = inherited(&doc, page_id, b"Resources") {
            let resources = resolve(&doc, resources)?.as_dict()?;
            if let Ok(font_dict) = resources.get(b"Font") {
                for (name, font) in resolve(&doc, font_dict)?.as_dict()?.iter() {
                    fonts.push((name.clone(), font.clone()));
                }
            }
        }

        let media_box = page_media_box(&doc, page_id);

        Ok(Self {
            doc,
            operations,
            fonts,
            media_box,
        })
    }
}

/// Scale matrix mapping the overlay page onto the target MediaBox.
fn fit_matrix(overlay: Option<[f32; 4]>, target: Option<[f32; 4]>) -> Option<[f32; 6]> {
    let [ox0, oy0, ox1, oy1] = overlay?;
    let [tx0, ty0, tx1, ty1] = target?;
    let (ow, oh) = ((ox1 - ox0).abs(), (oy1 - oy0).abs());
    if ow == 0.0 || oh == 0.0 {
        return None;
    }
    let sx = (tx1 - tx0).abs() / ow;
    let sy = (ty1 - ty0).abs() / oh;
    Some([sx, 0.0, 0.0, sy, tx0.min(tx1), ty0.min(ty1)])
}

/// Copy `object` and everything it references from `source` into `target`.
///
/// `imported` maps source ids to the ids already allocated in `target`, so
/// shared objects are copied once and cycles terminate.
fn import_object(
    target: &mut Document,
    source: &Document,
    object: &Object,
    imported: &mut BTreeMap<ObjectId, ObjectId>,
) -> Object {
    match object {
        Object::Reference(id) => {
            if let Some(&new_id) = imported.get(id) {
                return Object::Reference(new_id);
            }
            let new_id = target.new_object_id();
            imported.insert(*id, new_id);
            let copy = match source.get_object(*id) {
                Ok(resolved) => import_object(target, source, resolved, imported),
                Err(_) => Object::Null,
            };
            target.objects.insert(new_id, copy);
            Object::Reference(new_id)
        }
        Object::Array(items) => Object::Array(
            items
                .iter()
                .map(|item| import_object(target, source, item, imported))
                .collect(),
        ),
        Object::Dictionary(dict) => {
            Object::Dictionary(import_dictionary(target, source, dict, imported))
        }
        Object::Stream(stream) => {
            let mut copy = stream.clone();
            copy.dict = import_dictionary(target, source, &stream.dict, imported);
            Object::Stream(copy)
        }
        other => other.clone(),
    }
}

fn import_dictionary(
    target: &mut Document,
    source: &Document,
    dict: &Dictionary,
    imported: &mut BTreeMap<ObjectId, ObjectId>,
) -> Dictionary {
    let mut copy = Dictionary::new();
    for (key, value) in dict.iter() {
        copy.set(key.clone(), import_object(target, source, value, imported));
    }
    copy
}
