//! Data model shared by the pipeline stages.
//!
//! Everything here is keyed by the 0-based page index; no other identity
//! is used to correlate recognition results, table matches and overlays.

mod document;
mod record;
mod region;
mod style;

pub use document::SourceDocument;
pub(crate) use document::{inherited, page_media_box, resolve};
pub use record::{OverlaySpec, TabularRecord, EXTRA_VALUE_PREFIX};
pub use region::RecognitionRegion;
pub use style::{Anchor, PageSize, Rgb, StyleConfig, TextStyle, STANDARD_FONTS};
