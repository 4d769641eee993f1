//! In-process rasterization with MuPDF.

use image::RgbImage;
use mupdf::{Colorspace, Document, Matrix};

use crate::error::{Error, Result};
use crate::model::SourceDocument;

use super::{ensure_page_count, Rasterizer};

/// Renders pages with the MuPDF library.
///
/// MuPDF's context is not thread-safe, so each call opens its own
/// document and renders sequentially.
#[derive(Debug, Clone, Default)]
pub struct MupdfRasterizer;

impl MupdfRasterizer {
    pub fn new() -> Self {
        MupdfRasterizer
    }
}

impl Rasterizer for MupdfRasterizer {
    fn name(&self) -> &str {
        "mupdf"
    }

    fn rasterize(&self, document: &SourceDocument, dpi: u32) -> Result<Vec<RgbImage>> {
        let doc = Document::from_bytes(document.bytes(), "application/pdf")
            .map_err(|e| Error::DocumentFormat(format!("MuPDF could not open document: {}", e)))?;
        let count = doc
            .page_count()
            .map_err(|e| Error::DocumentFormat(e.to_string()))?;

        let scale = dpi as f32 / 72.0;
        let matrix = Matrix::new_scale(scale, scale);
        let colorspace = Colorspace::device_rgb();

        let mut images = Vec::with_capacity(count.max(0) as usize);
        for index in 0..count {
            let page = doc
                .load_page(index)
                .map_err(|e| Error::DocumentFormat(format!("page {}: {}", index, e)))?;
            let pixmap = page
                .to_pixmap(&matrix, &colorspace, false, false)
                .map_err(|e| Error::DocumentFormat(format!("page {}: {}", index, e)))?;
            images.push(pixmap_to_rgb(&pixmap)?);
        }

        ensure_page_count(self.name(), document, &images)?;
        Ok(images)
    }
}

fn pixmap_to_rgb(pixmap: &mupdf::Pixmap) -> Result<RgbImage> {
    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let samples = pixmap.samples();
    let n = pixmap.n() as usize; // components per pixel

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height as usize {
        for x in 0..width as usize {
            let offset = (y * width as usize + x) * n;
            let r = samples.get(offset).copied().unwrap_or(255);
            let g = samples.get(offset + 1).copied().unwrap_or(r);
            let b = samples.get(offset + 2).copied().unwrap_or(r);
            rgb.extend_from_slice(&[r, g, b]);
        }
    }

    RgbImage::from_raw(width, height, rgb)
        .ok_or_else(|| Error::Raster("failed to create image buffer".to_string()))
}
