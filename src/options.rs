//! Run parameters.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{Anchor, RecognitionRegion, Rgb, StyleConfig};

/// Sheet read from the workbook unless configured otherwise.
pub const DEFAULT_SHEET: &str = "Touren";

/// Name under which the stamped document is offered.
pub const OUTPUT_FILE_NAME: &str = "output_with_overlays_and_names.pdf";

/// MIME type of the stamped document.
pub const OUTPUT_MIME_TYPE: &str = "application/pdf";

/// Options for a stamping run.
///
/// Every field has a default, so a partial JSON file is a valid
/// configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StampOptions {
    /// Where the tour number is printed, in 72 DPI pixel space
    pub region: RecognitionRegion,

    /// Recognition language (tesseract language code)
    pub language: String,

    /// Rasterization resolution
    pub dpi: u32,

    /// Tesseract page segmentation mode (engine default when unset)
    pub page_segmentation: Option<u8>,

    /// Overlay anchors, colors and fonts
    pub style: StyleConfig,

    /// Workbook sheet holding the tour table
    pub sheet: String,

    /// How repeated tour numbers in the table are treated
    pub duplicate_policy: DuplicateKeyPolicy,

    /// How overlay coordinates map onto pages of other sizes
    pub placement: OverlayPlacement,

    /// Which renderer produces page rasters
    pub raster_backend: RasterBackend,

    /// Whether to recognize pages in parallel
    pub parallel: bool,
}

impl StampOptions {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a JSON file; missing keys keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    /// Load options from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Serialize options as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check that the options describe a runnable configuration.
    pub fn validate(&self) -> Result<()> {
        if self.language.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "recognition language must not be empty".to_string(),
            ));
        }
        if !(18..=1200).contains(&self.dpi) {
            return Err(Error::InvalidConfig(format!(
                "dpi must be between 18 and 1200, got {}",
                self.dpi
            )));
        }
        if let Some(psm) = self.page_segmentation {
            if psm > 13 {
                return Err(Error::InvalidConfig(format!(
                    "page segmentation mode must be 0-13, got {}",
                    psm
                )));
            }
        }
        if self.sheet.trim().is_empty() {
            return Err(Error::InvalidConfig("sheet name must not be empty".to_string()));
        }
        self.style.validate()
    }

    /// Set the recognition region.
    pub fn with_region(mut self, region: RecognitionRegion) -> Self {
        self.region = region;
        self
    }

    /// Set the recognition language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Set the rasterization resolution.
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    /// Set the tesseract page segmentation mode.
    pub fn with_page_segmentation(mut self, psm: u8) -> Self {
        self.page_segmentation = Some(psm);
        self
    }

    /// Replace the whole overlay style.
    pub fn with_style(mut self, style: StyleConfig) -> Self {
        self.style = style;
        self
    }

    /// Set where the combined name is drawn.
    pub fn with_name_anchor(mut self, anchor: Anchor) -> Self {
        self.style.primary_anchor = anchor;
        self
    }

    /// Set where the extra value is drawn (`None` disables it).
    pub fn with_extra_anchor(mut self, anchor: Option<Anchor>) -> Self {
        self.style.secondary_anchor = anchor;
        self
    }

    /// Set the combined name color.
    pub fn with_name_color(mut self, color: Rgb) -> Self {
        self.style.primary.color = color;
        self
    }

    /// Set the extra value color.
    pub fn with_extra_color(mut self, color: Rgb) -> Self {
        self.style.secondary.color = color;
        self
    }

    /// Set the combined name font size.
    pub fn with_name_size(mut self, size: f32) -> Self {
        self.style.primary.font_size = size;
        self
    }

    /// Set the extra value font size.
    pub fn with_extra_size(mut self, size: f32) -> Self {
        self.style.secondary.font_size = size;
        self
    }

    /// Set the workbook sheet.
    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = sheet.into();
        self
    }

    /// Set the duplicate key policy.
    pub fn with_duplicate_policy(mut self, policy: DuplicateKeyPolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// Fail on repeated tour numbers instead of taking the first row.
    pub fn reject_duplicates(mut self) -> Self {
        self.duplicate_policy = DuplicateKeyPolicy::Reject;
        self
    }

    /// Set overlay placement.
    pub fn with_placement(mut self, placement: OverlayPlacement) -> Self {
        self.placement = placement;
        self
    }

    /// Set the raster backend.
    pub fn with_raster_backend(mut self, backend: RasterBackend) -> Self {
        self.raster_backend = backend;
        self
    }

    /// Enable or disable parallel recognition.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel recognition.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

impl Default for StampOptions {
    fn default() -> Self {
        Self {
            region: RecognitionRegion::default(),
            language: "eng".to_string(),
            dpi: 72,
            page_segmentation: None,
            style: StyleConfig::default(),
            sheet: DEFAULT_SHEET.to_string(),
            duplicate_policy: DuplicateKeyPolicy::FirstWins,
            placement: OverlayPlacement::Absolute,
            raster_backend: RasterBackend::Pdftoppm,
            parallel: true,
        }
    }
}

/// Treatment of tour numbers that occur in more than one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicateKeyPolicy {
    /// The first row in table order is used
    #[default]
    FirstWins,
    /// Duplicates are a table format error
    Reject,
}

/// Mapping of overlay coordinates onto the target page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlayPlacement {
    /// Overlay coordinates are used as-is in the page's user space
    #[default]
    Absolute,
    /// The overlay page is scaled onto the target page's MediaBox
    FitPage,
}

/// Page renderer used for recognition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RasterBackend {
    /// `pdftoppm` from poppler-utils
    #[default]
    Pdftoppm,
    /// In-process MuPDF (requires the `mupdf` feature)
    Mupdf,
}
