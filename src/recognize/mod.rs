//! Region-constrained tour number recognition.
//!
//! For each page raster the recognizer crops the configured region,
//! upscales it 2x with a Lanczos filter and hands it to a
//! [`TextRecognizer`]. The recognized text is reduced to the first
//! word-bounded run of exactly four digits. Anything else (letters, stray
//! punctuation, longer numbers) is discarded rather than corrected: a
//! missed page is preferred over a wrong stamp. One pass per page is
//! authoritative; there are no retries and no confidence threshold.

mod tesseract;

pub use tesseract::TesseractRecognizer;

use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::RgbImage;
use regex::Regex;

use crate::error::{Error, Result};
use crate::model::RecognitionRegion;

/// Integer upscale applied to the cropped region before recognition.
pub const UPSCALE_FACTOR: u32 = 2;

/// Exactly four ASCII digits, word-bounded.
const CODE_PATTERN: &str = r"\b[0-9]{4}\b";

/// A text recognition engine.
pub trait TextRecognizer: Send + Sync {
    /// Engine name for logs and reports.
    fn name(&self) -> &str;

    /// Verify the engine can run with `language` before any page is read.
    ///
    /// An error here aborts the run.
    fn ensure_available(&self, _language: &str) -> Result<()> {
        Ok(())
    }

    /// Recognize the text in `image`.
    ///
    /// [`Error::Recognition`] means the engine cannot run at all and aborts
    /// the run; any other error only affects the page being read.
    fn recognize(&self, image: &RgbImage, language: &str) -> Result<String>;
}

/// What recognition produced for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionReading {
    /// A four digit code was found.
    Code(String),
    /// The recognized text contained no four digit run.
    NoCode { text: String },
    /// The region does not intersect the page raster.
    OutOfBounds,
    /// The engine failed on this page.
    Failed { reason: String },
}

impl RegionReading {
    /// The recognized code, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            RegionReading::Code(code) => Some(code),
            _ => None,
        }
    }
}

/// Crops, upscales and recognizes the tour number region of page rasters.
pub struct RegionRecognizer {
    engine: Arc<dyn TextRecognizer>,
    region: RecognitionRegion,
    language: String,
    code_pattern: Regex,
}

impl RegionRecognizer {
    /// Create a recognizer for a region given in 72 DPI pixel space.
    pub fn new(
        engine: Arc<dyn TextRecognizer>,
        region: RecognitionRegion,
        language: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            region,
            language: language.into(),
            code_pattern: Regex::new(CODE_PATTERN).expect("tour number pattern is valid"),
        }
    }

    /// The engine in use.
    pub fn engine(&self) -> &dyn TextRecognizer {
        self.engine.as_ref()
    }

    /// Check the engine once before reading pages.
    pub fn ensure_available(&self) -> Result<()> {
        self.engine.ensure_available(&self.language)
    }

    /// Crop the region out of a raster rendered at `dpi` and upscale it.
    ///
    /// Returns `None` when the region lies entirely outside the raster.
    pub fn prepare(&self, page: &RgbImage, dpi: u32) -> Option<RgbImage> {
        let region = self
            .region
            .for_dpi(dpi)
            .clamp_to(page.width(), page.height())?;

        let cropped = imageops::crop_imm(
            page,
            region.x0(),
            region.y0(),
            region.width(),
            region.height(),
        )
        .to_image();

        Some(imageops::resize(
            &cropped,
            cropped.width() * UPSCALE_FACTOR,
            cropped.height() * UPSCALE_FACTOR,
            FilterType::Lanczos3,
        ))
    }

    /// Read the tour number of one page raster.
    pub fn read(&self, page: &RgbImage, dpi: u32) -> Result<RegionReading> {
        let Some(prepared) = self.prepare(page, dpi) else {
            return Ok(RegionReading::OutOfBounds);
        };

        match self.engine.recognize(&prepared, &self.language) {
            Ok(text) => Ok(match self.extract_code(&text) {
                Some(code) => RegionReading::Code(code),
                None => RegionReading::NoCode { text },
            }),
            Err(e @ Error::Recognition(_)) => Err(e),
            Err(e) => Ok(RegionReading::Failed {
                reason: e.to_string(),
            }),
        }
    }

    /// First four digit run in reading order.
    pub fn extract_code(&self, text: &str) -> Option<String> {
        self.code_pattern
            .find(text)
            .map(|m| m.as_str().to_string())
    }
}
