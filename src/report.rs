//! Run report: per-page outcomes, page warnings and statistics.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::OverlaySpec;

/// A page-local problem. The page is passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageWarning {
    /// No four digit code in the recognition region.
    RecognitionMiss { page: usize },
    /// The recognition region lies outside the page raster.
    RegionOutOfBounds { page: usize },
    /// The recognition engine failed on the page.
    RecognitionFailed { page: usize, reason: String },
    /// The recognized code is not in the table.
    MatchMiss { page: usize, code: String },
    /// The overlay could not be merged onto the page.
    OverlayMergeDefect { page: usize, reason: String },
}

impl PageWarning {
    /// 0-based index of the affected page.
    pub fn page(&self) -> usize {
        match self {
            PageWarning::RecognitionMiss { page }
            | PageWarning::RegionOutOfBounds { page }
            | PageWarning::RecognitionFailed { page, .. }
            | PageWarning::MatchMiss { page, .. }
            | PageWarning::OverlayMergeDefect { page, .. } => *page,
        }
    }
}

impl fmt::Display for PageWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageWarning::RecognitionMiss { page } => {
                write!(f, "page {}: no tour number recognized", page)
            }
            PageWarning::RegionOutOfBounds { page } => {
                write!(f, "page {}: recognition region outside the page", page)
            }
            PageWarning::RecognitionFailed { page, reason } => {
                write!(f, "page {}: recognition failed: {}", page, reason)
            }
            PageWarning::MatchMiss { page, code } => {
                write!(f, "page {}: tour number {} not in table", page, code)
            }
            PageWarning::OverlayMergeDefect { page, reason } => {
                write!(f, "page {}: overlay not merged: {}", page, reason)
            }
        }
    }
}

/// What happened to one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageOutcome {
    pub index: usize,
    /// Recognized tour number
    pub code: Option<String>,
    /// Overlay text, when the code matched a record
    pub overlay: Option<OverlaySpec>,
    /// Whether the overlay was merged onto the page
    pub stamped: bool,
}

impl PageOutcome {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            code: None,
            overlay: None,
            stamped: false,
        }
    }
}

/// Counters over a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StampStats {
    /// Pages in the document (and in the output)
    pub page_count: usize,

    /// Pages with a recognized tour number
    pub codes_recognized: usize,

    /// Pages whose tour number matched a record
    pub matched: usize,

    /// Pages that received an overlay
    pub stamped: usize,

    /// Page warnings raised
    pub warning_count: usize,
}

/// Report of a stamping run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StampReport {
    /// One entry per page, in page order
    pub pages: Vec<PageOutcome>,
    /// Every page warning, in page order
    pub warnings: Vec<PageWarning>,
    pub stats: StampStats,
}

impl StampReport {
    /// Build the report and its counters from page outcomes and warnings.
    pub fn new(pages: Vec<PageOutcome>, mut warnings: Vec<PageWarning>) -> Self {
        warnings.sort_by_key(PageWarning::page);
        let stats = StampStats {
            page_count: pages.len(),
            codes_recognized: pages.iter().filter(|p| p.code.is_some()).count(),
            matched: pages.iter().filter(|p| p.overlay.is_some()).count(),
            stamped: pages.iter().filter(|p| p.stamped).count(),
            warning_count: warnings.len(),
        };
        Self {
            pages,
            warnings,
            stats,
        }
    }

    /// Warnings raised for `page`.
    pub fn warnings_for(&self, page: usize) -> impl Iterator<Item = &PageWarning> {
        self.warnings.iter().filter(move |w| w.page() == page)
    }

    /// Indices of stamped pages.
    pub fn stamped_pages(&self) -> Vec<usize> {
        self.pages
            .iter()
            .filter(|p| p.stamped)
            .map(|p| p.index)
            .collect()
    }

    /// Serialize the report as pretty JSON.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
