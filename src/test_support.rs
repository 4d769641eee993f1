//! PDF fixtures for unit tests.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};

use crate::model::{inherited, resolve, SourceDocument};

/// A Letter sized document whose page `i` shows the text `Page i`.
///
/// The font resources live on the page tree root and are inherited by
/// every page.
pub(crate) fn sample_pdf(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for index in 0..pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        format!("Page {}", index).into_bytes(),
                        StringFormat::Literal,
                    )],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            lopdf::Dictionary::new(),
            content.encode().unwrap(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

pub(crate) fn blank_document(pages: usize) -> SourceDocument {
    SourceDocument::from_bytes(sample_pdf(pages)).unwrap()
}

/// Raw (decompressed) content of one page.
pub(crate) fn page_content(doc: &SourceDocument, index: usize) -> Vec<u8> {
    let page_id = doc.page_id(index).unwrap();
    doc.pdf().get_page_content(page_id).unwrap()
}

/// Decoded content operations of one page.
pub(crate) fn page_operations(doc: &SourceDocument, index: usize) -> Vec<Operation> {
    Content::decode(&page_content(doc, index)).unwrap().operations
}

/// Sorted font resource names visible to one page.
pub(crate) fn page_font_names(doc: &SourceDocument, index: usize) -> Vec<String> {
    let pdf = doc.pdf();
    let page_id = doc.page_id(index).unwrap();
    let resources = inherited(pdf, page_id, b"Resources").unwrap();
    let resources = resolve(pdf, resources).unwrap().as_dict().unwrap();
    let fonts = resolve(pdf, resources.get(b"Font").unwrap())
        .unwrap()
        .as_dict()
        .unwrap();
    let mut names: Vec<String> = fonts
        .iter()
        .map(|(name, _)| String::from_utf8_lossy(name).into_owned())
        .collect();
    names.sort();
    names
}
