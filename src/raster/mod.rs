//! Page rasterization.
//!
//! A [`Rasterizer`] renders every page of a [`SourceDocument`] to an RGB
//! raster, in page index order, at a requested resolution. Rasters are
//! scratch data for recognition and are dropped once a page is read.

#[cfg(feature = "mupdf")]
mod mupdf;
mod pdftoppm;

#[cfg(feature = "mupdf")]
pub use self::mupdf::MupdfRasterizer;
pub use pdftoppm::PdftoppmRasterizer;

use std::sync::Arc;

use image::RgbImage;

use crate::error::{Error, Result};
use crate::model::SourceDocument;
use crate::options::RasterBackend;

/// Renders document pages to raster images.
pub trait Rasterizer: Send + Sync {
    /// Backend name for logs and reports.
    fn name(&self) -> &str;

    /// Render all pages at `dpi`, returning one image per page in order.
    ///
    /// Implementations must not depend on the page's paper size beyond
    /// what the renderer produces at that resolution.
    fn rasterize(&self, document: &SourceDocument, dpi: u32) -> Result<Vec<RgbImage>>;
}

/// Build the rasterizer for a configured backend.
pub fn rasterizer_for(backend: RasterBackend) -> Result<Arc<dyn Rasterizer>> {
    match backend {
        RasterBackend::Pdftoppm => Ok(Arc::new(PdftoppmRasterizer::new())),
        #[cfg(feature = "mupdf")]
        RasterBackend::Mupdf => Ok(Arc::new(MupdfRasterizer::new())),
        #[cfg(not(feature = "mupdf"))]
        RasterBackend::Mupdf => Err(Error::InvalidConfig(
            "the mupdf raster backend requires the `mupdf` feature".to_string(),
        )),
    }
}

/// Check that a backend returned exactly one raster per page.
pub(crate) fn ensure_page_count(
    backend: &str,
    document: &SourceDocument,
    images: &[RgbImage],
) -> Result<()> {
    if images.len() != document.page_count() {
        return Err(Error::DocumentFormat(format!(
            "{} rendered {} page(s), document has {}",
            backend,
            images.len(),
            document.page_count()
        )));
    }
    Ok(())
}
