//! # ocrstamp
//!
//! Stamp names onto scanned tour sheets.
//!
//! Every page of a scanned PDF carries a four digit tour number at a fixed
//! spot. This library recognizes that number, looks it up in the tour
//! table of an xlsx workbook and writes the matching names back onto the
//! page as colored text, producing a new PDF with the same pages in the
//! same order.
//!
//! ## Quick Start
//!
//! ```no_run
//! use ocrstamp::{stamp_files, StampOptions};
//!
//! fn main() -> ocrstamp::Result<()> {
//!     let output = stamp_files("tours.pdf", "tours.xlsx", &StampOptions::default())?;
//!     output.write_to(".")?;
//!
//!     for warning in &output.report.warnings {
//!         eprintln!("{}", warning);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline
//!
//! - **Rasterize**: pages are rendered with `pdftoppm` (or MuPDF with the
//!   `mupdf` feature)
//! - **Recognize**: a fixed region is cropped, upscaled and read by tesseract
//! - **Match**: the first four digit run is looked up in the tour table
//! - **Compose**: names are laid out on a transparent overlay page
//! - **Merge**: overlays are drawn on top of the original page content
//!
//! Problems that only affect one page never abort a run; they are collected
//! as [`PageWarning`]s and the page is passed through unchanged.

pub mod compose;
pub mod detect;
pub mod error;
pub mod matcher;
pub mod merge;
pub mod model;
pub mod options;
pub mod pipeline;
pub mod raster;
pub mod recognize;
pub mod report;
pub mod table;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use compose::OverlayComposer;
pub use detect::{detect_format_from_bytes, PdfFormat};
pub use error::{Error, Result};
pub use matcher::{PageMatches, RecordMatcher};
pub use merge::{DocumentMerger, MergeOutcome};
pub use model::{
    Anchor, OverlaySpec, PageSize, RecognitionRegion, Rgb, SourceDocument, StyleConfig,
    TabularRecord, TextStyle,
};
pub use options::{
    DuplicateKeyPolicy, OverlayPlacement, RasterBackend, StampOptions, OUTPUT_FILE_NAME,
    OUTPUT_MIME_TYPE,
};
pub use pipeline::{Progress, Stage, StampOutput, Stamper};
pub use raster::{PdftoppmRasterizer, Rasterizer};
pub use recognize::{RegionReading, RegionRecognizer, TesseractRecognizer, TextRecognizer};
pub use report::{PageOutcome, PageWarning, StampReport, StampStats};
pub use table::{RecordTable, TableSchema};

#[cfg(feature = "mupdf")]
pub use raster::MupdfRasterizer;

use std::path::Path;

/// Stamp a PDF file using the tour table of an xlsx file.
///
/// # Example
///
/// ```no_run
/// use ocrstamp::{stamp_files, StampOptions};
///
/// let options = StampOptions::new().with_dpi(150).sequential();
/// let output = stamp_files("tours.pdf", "tours.xlsx", &options).unwrap();
/// std::fs::write(&output.file_name, &output.bytes).unwrap();
/// ```
pub fn stamp_files<P, Q>(pdf: P, xlsx: Q, options: &StampOptions) -> Result<StampOutput>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    options.validate()?;
    let table = RecordTable::from_path(xlsx, &options.sheet, options.duplicate_policy)?;
    let document = SourceDocument::open(pdf)?;
    Stamper::new(options.clone()).stamp(&document, &table)
}

/// Stamp PDF bytes using the tour table of xlsx bytes.
pub fn stamp_bytes(pdf: &[u8], xlsx: &[u8], options: &StampOptions) -> Result<StampOutput> {
    Stamper::new(options.clone()).stamp_bytes(pdf, xlsx)
}

/// Recognize the tour number of every page of a PDF file.
///
/// # Example
///
/// ```no_run
/// use ocrstamp::{scan_file, StampOptions};
///
/// for (page, reading) in scan_file("tours.pdf", &StampOptions::default())?.iter().enumerate() {
///     println!("{}: {:?}", page, reading.code());
/// }
/// # Ok::<(), ocrstamp::Error>(())
/// ```
pub fn scan_file<P: AsRef<Path>>(pdf: P, options: &StampOptions) -> Result<Vec<RegionReading>> {
    let document = SourceDocument::open(pdf)?;
    Stamper::new(options.clone()).scan(&document)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_bytes_rejects_bad_table_first() {
        let pdf = test_support::sample_pdf(1);
        let result = stamp_bytes(&pdf, b"not a workbook", &StampOptions::default());
        assert!(matches!(result, Err(Error::TableFormat(_))));
    }

    #[test]
    fn test_stamp_files_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let result = stamp_files(
            dir.path().join("missing.pdf"),
            dir.path().join("missing.xlsx"),
            &StampOptions::default(),
        );
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_invalid_options_checked_before_io() {
        let options = StampOptions::default().with_language("");
        let result = stamp_files("missing.pdf", "missing.xlsx", &options);
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_scan_file_rejects_non_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        std::fs::write(&path, b"plain text").unwrap();
        let result = scan_file(&path, &StampOptions::default());
        assert!(matches!(result, Err(Error::UnknownFormat)));
    }
}
