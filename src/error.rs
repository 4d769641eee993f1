//! Error types for ocrstamp library.

use std::io;
use thiserror::Error;

/// Result type alias for ocrstamp operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a stamping run.
///
/// Page-local problems (no code, no match, a broken overlay) are not errors;
/// they are reported as [`crate::PageWarning`]s and the page passes through.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF version is not supported.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// The input document is unreadable or corrupt.
    #[error("Document format error: {0}")]
    DocumentFormat(String),

    /// The spreadsheet is unreadable or lacks the required columns.
    #[error("Table format error: {0}")]
    TableFormat(String),

    /// The rasterizer backend is unavailable or failed.
    #[error("Rasterization error: {0}")]
    Raster(String),

    /// The recognition engine is unavailable.
    #[error("Recognition error: {0}")]
    Recognition(String),

    /// The recognition engine failed on a single page.
    #[error("Recognition engine failed: {0}")]
    EngineFailure(String),

    /// An overlay page could not be built or merged.
    #[error("Overlay error: {0}")]
    Overlay(String),

    /// A run parameter is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Page index is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(usize, usize),

    /// Configuration or report (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            _ => Error::DocumentFormat(err.to_string()),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Raster(err.to_string())
    }
}

impl From<calamine::XlsxError> for Error {
    fn from(err: calamine::XlsxError) -> Self {
        Error::TableFormat(err.to_string())
    }
}
