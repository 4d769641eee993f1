//! Overlay page composition.
//!
//! An overlay is a blank single-page PDF of the configured overlay page
//! size carrying nothing but the stamped text. It is built with lopdf and
//! later merged on top of the source page.

use std::collections::BTreeMap;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};

use crate::error::{Error, Result};
use crate::model::{Anchor, OverlaySpec, StyleConfig, TextStyle};

/// Substitute for characters the font encoding cannot represent.
const REPLACEMENT: u8 = b'?';

/// Builds overlay pages from [`OverlaySpec`]s.
#[derive(Debug, Clone)]
pub struct OverlayComposer {
    style: StyleConfig,
}

impl OverlayComposer {
    pub fn new(style: StyleConfig) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &StyleConfig {
        &self.style
    }

    /// Build the overlay page for one spec and return it as PDF bytes.
    ///
    /// The combined name is drawn at the primary anchor and the extra value
    /// at the secondary anchor; empty strings are not drawn at all.
    pub fn compose(&self, spec: &OverlaySpec) -> Result<Vec<u8>> {
        let mut fonts = FontTable::default();
        let mut operations = Vec::new();

        if !spec.combined_name.is_empty() {
            let resource = fonts.resource_for(&self.style.primary.font);
            draw_text(
                &mut operations,
                &resource,
                &self.style.primary,
                self.style.primary_anchor,
                &spec.combined_name,
            );
        }

        if let Some(anchor) = self.style.secondary_anchor {
            if !spec.extra_value.is_empty() {
                let resource = fonts.resource_for(&self.style.secondary.font);
                draw_text(
                    &mut operations,
                    &resource,
                    &self.style.secondary,
                    anchor,
                    &spec.extra_value,
                );
            }
        }

        let content = Content { operations }
            .encode()
            .map_err(|e| Error::Overlay(format!("failed to encode overlay content: {}", e)))?;

        self.build_page(fonts, content)
    }

    fn build_page(&self, fonts: FontTable, content: Vec<u8>) -> Result<Vec<u8>> {
        let mut doc = Document::with_version("1.4");
        let pages_id = doc.new_object_id();

        let mut font_dict = lopdf::Dictionary::new();
        for (resource, base_font) in fonts.entries {
            let mut font = dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => Object::Name(base_font.as_bytes().to_vec()),
            };
            if !is_symbolic(&base_font) {
                font.set("Encoding", "WinAnsiEncoding");
            }
            let font_id = doc.add_object(font);
            font_dict.set(resource, font_id);
        }

        let content_id = doc.add_object(Stream::new(lopdf::Dictionary::new(), content));
        let size = self.style.page_size;
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), Object::Real(size.width), Object::Real(size.height)],
            "Resources" => dictionary! { "Font" => font_dict },
            "Contents" => content_id,
        });

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out)
            .map_err(|e| Error::Overlay(format!("failed to write overlay page: {}", e)))?;
        Ok(out)
    }
}

/// Resource names of the fonts an overlay uses, one per distinct font.
#[derive(Default)]
struct FontTable {
    entries: BTreeMap<String, String>,
}

impl FontTable {
    fn resource_for(&mut self, base_font: &str) -> String {
        if let Some((resource, _)) = self.entries.iter().find(|(_, font)| *font == base_font) {
            return resource.clone();
        }
        let resource = format!("F{}", self.entries.len() + 1);
        self.entries.insert(resource.clone(), base_font.to_string());
        resource
    }
}

fn draw_text(ops: &mut Vec<Operation>, font: &str, style: &TextStyle, at: Anchor, text: &str) {
    let [r, g, b] = style.color.to_unit();
    ops.push(Operation::new(
        "rg",
        vec![Object::Real(r), Object::Real(g), Object::Real(b)],
    ));
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new(
        "Tf",
        vec![Object::Name(font.as_bytes().to_vec()), Object::Real(style.font_size)],
    ));
    ops.push(Operation::new("Td", vec![Object::Real(at.x), Object::Real(at.y)]));
    ops.push(Operation::new(
        "Tj",
        vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
    ));
    ops.push(Operation::new("ET", vec![]));
}

fn is_symbolic(base_font: &str) -> bool {
    matches!(base_font, "Symbol" | "ZapfDingbats")
}

/// Encode text for a standard font with WinAnsiEncoding.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| {
            win_ansi_byte(c).unwrap_or_else(|| {
                log::debug!("No WinAnsi code for {:?}, substituting '?'", c);
                REPLACEMENT
            })
        })
        .collect()
}

fn win_ansi_byte(c: char) -> Option<u8> {
    let code = c as u32;
    match code {
        0x20..=0x7E | 0xA0..=0xFF => Some(code as u8),
        _ => {
            let byte = match c {
                '€' => 0x80,
                '‚' => 0x82,
                'ƒ' => 0x83,
                '„' => 0x84,
                '…' => 0x85,
                '†' => 0x86,
                '‡' => 0x87,
                'ˆ' => 0x88,
                '‰' => 0x89,
                'Š' => 0x8A,
                '‹' => 0x8B,
                'Œ' => 0x8C,
                'Ž' => 0x8E,
                '\u{2018}' => 0x91,
                '\u{2019}' => 0x92,
                '\u{201C}' => 0x93,
                '\u{201D}' => 0x94,
                '•' => 0x95,
                '\u{2013}' => 0x96,
                '\u{2014}' => 0x97,
                '˜' => 0x98,
                '™' => 0x99,
                'š' => 0x9A,
                '›' => 0x9B,
                'œ' => 0x9C,
                'ž' => 0x9E,
                'Ÿ' => 0x9F,
                _ => return None,
            };
            Some(byte)
        }
    }
}
