//! Shared fixtures for integration tests.
//!
//! Real rasterizers and OCR engines are replaced by fakes: every page is
//! rendered as a uniform gray level that encodes its index, and the fake
//! engine maps that gray level back to a scripted text. This keeps the
//! fakes order-independent, so parallel recognition is exercised too.

#![allow(dead_code)]

use image::RgbImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};

use ocrstamp::{
    DuplicateKeyPolicy, RecordTable, Rasterizer, Result, SourceDocument, TabularRecord,
    TextRecognizer,
};

/// Gray step between consecutive pages.
const GRAY_STEP: u32 = 40;

/// Pages the gray encoding can tell apart.
pub const MAX_PAGES: usize = 6;

/// Build a document with `sizes.len()` pages; page `i` shows `Scan i`.
pub fn scanned_pdf(sizes: &[(f32, f32)]) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Times-Roman",
    });

    let mut kids = Vec::new();
    for (index, (width, height)) in sizes.iter().enumerate() {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 10.into()]),
                Operation::new("Td", vec![50.into(), 50.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        format!("Scan {}", index).into_bytes(),
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
            "MediaBox" => vec![0.into(), 0.into(), Object::Real(*width), Object::Real(*height)],
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => sizes.len() as i64,
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

/// `pages` A4 pages.
pub fn a4_pdf(pages: usize) -> Vec<u8> {
    scanned_pdf(&vec![(595.2756, 841.8898); pages])
}

/// Renders page `i` as a uniform gray raster of level `40 * (i + 1)`.
pub struct GrayRasterizer;

impl Rasterizer for GrayRasterizer {
    fn name(&self) -> &str {
        "gray"
    }

    fn rasterize(&self, document: &SourceDocument, dpi: u32) -> Result<Vec<RgbImage>> {
        assert!(document.page_count() <= MAX_PAGES);
        let scale = dpi as f32 / 72.0;
        (0..document.page_count())
            .map(|index| {
                let size = document.page_size(index)?;
                let level = (GRAY_STEP * (index as u32 + 1)) as u8;
                Ok(RgbImage::from_pixel(
                    (size.width * scale) as u32,
                    (size.height * scale) as u32,
                    image::Rgb([level, level, level]),
                ))
            })
            .collect()
    }
}

/// Answers with `texts[i]` for regions cropped from page `i`.
pub struct ScriptedRecognizer {
    texts: Vec<String>,
}

impl ScriptedRecognizer {
    pub fn new(texts: &[&str]) -> Self {
        Self {
            texts: texts.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl TextRecognizer for ScriptedRecognizer {
    fn name(&self) -> &str {
        "scripted"
    }

    fn recognize(&self, image: &RgbImage, _language: &str) -> Result<String> {
        let level = image.get_pixel(image.width() / 2, image.height() / 2)[0] as u32;
        let index = ((level + GRAY_STEP / 2) / GRAY_STEP).saturating_sub(1) as usize;
        Ok(self.texts.get(index).cloned().unwrap_or_default())
    }
}

pub fn record(tour: &str, name_4: &str, name_7: &str, name_12: &str) -> TabularRecord {
    let field = |s: &str| (!s.is_empty()).then(|| s.to_string());
    TabularRecord::new(tour, field(name_4), field(name_7), field(name_12))
}

pub fn table(records: Vec<TabularRecord>) -> RecordTable {
    RecordTable::from_records(records, DuplicateKeyPolicy::FirstWins).unwrap()
}

pub fn operations(doc: &SourceDocument, page: usize) -> Vec<Operation> {
    let page_id = doc.page_id(page).unwrap();
    let content = doc.pdf().get_page_content(page_id).unwrap();
    Content::decode(&content).unwrap().operations
}

/// Text shown on a page, in content order.
pub fn shown_text(doc: &SourceDocument, page: usize) -> Vec<String> {
    operations(doc, page)
        .iter()
        .filter(|op| op.operator == "Tj")
        .map(|op| String::from_utf8_lossy(op.operands[0].as_str().unwrap()).into_owned())
        .collect()
}

/// A drawn string with the color and position it was drawn with.
#[derive(Debug, PartialEq)]
pub struct DrawnText {
    pub text: String,
    pub color: [f32; 3],
    pub position: [f32; 2],
    pub size: f32,
}

/// Every string shown after the last color change, with its state.
pub fn drawn_text(doc: &SourceDocument, page: usize) -> Vec<DrawnText> {
    let mut drawn = Vec::new();
    let mut color = [0.0; 3];
    let mut position = [0.0; 2];
    let mut size = 0.0;
    let float = |o: &Object| o.as_float().unwrap();

    for op in operations(doc, page) {
        match op.operator.as_str() {
            "rg" => color = [float(&op.operands[0]), float(&op.operands[1]), float(&op.operands[2])],
            "Td" => position = [float(&op.operands[0]), float(&op.operands[1])],
            "Tf" => size = float(&op.operands[1]),
            "Tj" => drawn.push(DrawnText {
                text: String::from_utf8_lossy(op.operands[0].as_str().unwrap()).into_owned(),
                color,
                position,
                size,
            }),
            _ => {}
        }
    }
    drawn
}

/// An xlsx workbook with one worksheet per `(name, rows)` entry.
///
/// Cells that parse as numbers are stored as numeric values, empty cells
/// are left out and everything else becomes an inline string.
pub fn xlsx_workbook(sheets: &[(&str, &[&[&str]])]) -> Vec<u8> {
    build_xlsx(sheets, true)
}

/// A workbook that lists its sheets but lacks the worksheet parts.
pub fn xlsx_without_sheet_parts(names: &[&str]) -> Vec<u8> {
    let sheets: Vec<(&str, &[&[&str]])> = names.iter().map(|name| (*name, &[][..])).collect();
    build_xlsx(&sheets, false)
}

fn build_xlsx(sheets: &[(&str, &[&[&str]])], with_sheet_parts: bool) -> Vec<u8> {
    use std::io::{Cursor, Write};
    use zip::{write::SimpleFileOptions, ZipWriter};

    let mut overrides = String::new();
    let mut entries = String::new();
    let mut relationships = String::new();
    for (i, (name, _)) in sheets.iter().enumerate() {
        let n = i + 1;
        overrides.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        ));
        entries.push_str(&format!(
            r#"<sheet name="{}" sheetId="{n}" r:id="rId{n}"/>"#,
            xml_escape(name)
        ));
        relationships.push_str(&format!(
            r#"<Relationship Id="rId{n}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{n}.xml"/>"#
        ));
    }

    let mut buffer = Vec::new();
    {
        let mut writer = ZipWriter::new(Cursor::new(&mut buffer));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

        writer.start_file("[Content_Types].xml", options).unwrap();
        writer
            .write_all(
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>{overrides}</Types>"#
                )
                .as_bytes(),
            )
            .unwrap();

        writer.start_file("_rels/.rels", options).unwrap();
        writer
            .write_all(
                br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#,
            )
            .unwrap();

        writer.start_file("xl/workbook.xml", options).unwrap();
        writer
            .write_all(
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>{entries}</sheets></workbook>"#
                )
                .as_bytes(),
            )
            .unwrap();

        writer.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
        writer
            .write_all(
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{relationships}</Relationships>"#
                )
                .as_bytes(),
            )
            .unwrap();

        if with_sheet_parts {
            for (i, (_, rows)) in sheets.iter().enumerate() {
                writer
                    .start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)
                    .unwrap();
                writer.write_all(worksheet_xml(rows).as_bytes()).unwrap();
            }
        }

        writer.finish().unwrap();
    }
    buffer
}

fn worksheet_xml(rows: &[&[&str]]) -> String {
    let mut data = String::new();
    for (r, row) in rows.iter().enumerate() {
        let number = r + 1;
        data.push_str(&format!(r#"<row r="{number}">"#));
        for (c, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            let cell = format!("{}{}", column_name(c), number);
            if value.parse::<f64>().is_ok() {
                data.push_str(&format!(r#"<c r="{cell}"><v>{value}</v></c>"#));
            } else {
                data.push_str(&format!(
                    r#"<c r="{cell}" t="inlineStr"><is><t>{}</t></is></c>"#,
                    xml_escape(value)
                ));
            }
        }
        data.push_str("</row>");
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{data}</sheetData></worksheet>"#
    )
}

/// `0` is `A`, `25` is `Z`.
fn column_name(index: usize) -> char {
    assert!(index < 26);
    (b'A' + index as u8) as char
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Header plus rows laid out on the A/D/G/L tour columns.
pub fn tour_rows<'a>(rows: &[[&'a str; 4]]) -> Vec<Vec<&'a str>> {
    let mut out = vec![vec!["TOUR", "", "", "Fahrer", "", "", "Beifahrer", "", "", "", "", "Einsatz"]];
    for &[tour, name_4, name_7, name_12] in rows {
        out.push(vec![tour, "", "", name_4, "", "", name_7, "", "", "", "", name_12]);
    }
    out
}

/// A workbook whose `sheet` holds the given tour rows under a header.
pub fn tour_workbook(sheet: &str, rows: &[[&str; 4]]) -> Vec<u8> {
    let rows = tour_rows(rows);
    let rows: Vec<&[&str]> = rows.iter().map(Vec::as_slice).collect();
    xlsx_workbook(&[(sheet, rows.as_slice())])
}
