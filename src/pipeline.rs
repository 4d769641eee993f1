//! The stamping pipeline.
//!
//! Rasterize → recognize → match → compose → merge. Pages are independent
//! until the final merge, which keeps the source page order. Recognition
//! fans out over rayon when [`StampOptions::parallel`] is set; results are
//! collected back by page index so order never depends on scheduling.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use image::RgbImage;
use rayon::prelude::*;

use crate::compose::OverlayComposer;
use crate::error::Result;
use crate::matcher::RecordMatcher;
use crate::merge::DocumentMerger;
use crate::model::SourceDocument;
use crate::options::{StampOptions, OUTPUT_FILE_NAME, OUTPUT_MIME_TYPE};
use crate::raster::{rasterizer_for, Rasterizer};
use crate::recognize::{RegionReading, RegionRecognizer, TesseractRecognizer, TextRecognizer};
use crate::report::{PageOutcome, PageWarning, StampReport};
use crate::table::RecordTable;

/// Pipeline stage reported through the progress callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Rasterize,
    Recognize,
    Compose,
    Merge,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Rasterize => "rasterizing",
            Stage::Recognize => "recognizing",
            Stage::Compose => "composing",
            Stage::Merge => "merging",
        };
        f.write_str(name)
    }
}

/// Progress of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub stage: Stage,
    pub completed: usize,
    pub total: usize,
}

type ProgressCallback = Arc<dyn Fn(Progress) + Send + Sync>;

/// The stamped document and what happened to each page.
#[derive(Debug, Clone)]
pub struct StampOutput {
    pub bytes: Vec<u8>,
    /// Always [`OUTPUT_FILE_NAME`]
    pub file_name: String,
    /// Always [`OUTPUT_MIME_TYPE`]
    pub mime_type: String,
    pub report: StampReport,
}

impl StampOutput {
    fn new(bytes: Vec<u8>, report: StampReport) -> Self {
        Self {
            bytes,
            file_name: OUTPUT_FILE_NAME.to_string(),
            mime_type: OUTPUT_MIME_TYPE.to_string(),
            report,
        }
    }

    /// Write the document into `dir` under its file name.
    pub fn write_to<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let path = dir.as_ref().join(&self.file_name);
        self.write_to_file(&path)?;
        Ok(path)
    }

    /// Write the document to `path`.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, &self.bytes)?;
        Ok(())
    }
}

/// Runs the pipeline with a fixed configuration.
///
/// Rasterizer and recognizer default to the configured backend and
/// tesseract; both can be replaced.
///
/// # Example
/// ```no_run
/// use ocrstamp::{RecordTable, SourceDocument, StampOptions, Stamper};
///
/// let options = StampOptions::default();
/// let document = SourceDocument::open("tours.pdf")?;
/// let table = RecordTable::from_path("tours.xlsx", &options.sheet, options.duplicate_policy)?;
/// let output = Stamper::new(options).stamp(&document, &table)?;
/// output.write_to(".")?;
/// # Ok::<(), ocrstamp::Error>(())
/// ```
pub struct Stamper {
    options: StampOptions,
    rasterizer: Option<Arc<dyn Rasterizer>>,
    recognizer: Option<Arc<dyn TextRecognizer>>,
    progress: Option<ProgressCallback>,
}

impl Stamper {
    pub fn new(options: StampOptions) -> Self {
        Self {
            options,
            rasterizer: None,
            recognizer: None,
            progress: None,
        }
    }

    /// Use a specific rasterizer instead of the configured backend.
    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    /// Use a specific text recognizer instead of tesseract.
    pub fn with_recognizer(mut self, recognizer: Arc<dyn TextRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    /// Receive progress after every page of every stage.
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(Progress) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(callback));
        self
    }

    pub fn options(&self) -> &StampOptions {
        &self.options
    }

    /// Load both inputs from bytes and stamp.
    pub fn stamp_bytes(&self, pdf: &[u8], xlsx: &[u8]) -> Result<StampOutput> {
        self.options.validate()?;
        let table =
            RecordTable::from_xlsx_bytes(xlsx, &self.options.sheet, self.options.duplicate_policy)?;
        let document = SourceDocument::from_bytes(pdf)?;
        self.stamp(&document, &table)
    }

    /// Recognize the tour number of every page.
    ///
    /// Returns one reading per page in page order.
    pub fn scan(&self, document: &SourceDocument) -> Result<Vec<RegionReading>> {
        self.options.validate()?;

        let recognizer = RegionRecognizer::new(
            self.recognizer(),
            self.options.region,
            self.options.language.clone(),
        );
        recognizer.ensure_available()?;
        log::info!(
            "Reading tour numbers from {} ({}) with {}",
            document.format(),
            self.options.region,
            recognizer.engine().name()
        );

        let rasters = self.rasterize(document)?;
        self.recognize(&recognizer, &rasters)
    }

    /// Run the whole pipeline.
    pub fn stamp(&self, document: &SourceDocument, table: &RecordTable) -> Result<StampOutput> {
        let readings = self.scan(document)?;

        let mut pages: Vec<PageOutcome> = (0..readings.len()).map(PageOutcome::new).collect();
        let mut warnings = Vec::new();
        let mut codes = Vec::with_capacity(readings.len());

        for (page, reading) in readings.into_iter().enumerate() {
            let code = match reading {
                RegionReading::Code(code) => Some(code),
                RegionReading::NoCode { text } => {
                    log::debug!("Page {}: no tour number in {:?}", page, text.trim());
                    warnings.push(PageWarning::RecognitionMiss { page });
                    None
                }
                RegionReading::OutOfBounds => {
                    warnings.push(PageWarning::RegionOutOfBounds { page });
                    None
                }
                RegionReading::Failed { reason } => {
                    warnings.push(PageWarning::RecognitionFailed { page, reason });
                    None
                }
            };
            pages[page].code = code.clone();
            codes.push(code);
        }

        let matches = RecordMatcher::new(table).match_pages(&codes);
        for (page, code) in matches.unmatched {
            warnings.push(PageWarning::MatchMiss { page, code });
        }

        let composer = OverlayComposer::new(self.options.style.clone());
        let total = matches.overlays.len();
        let mut overlays = BTreeMap::new();
        for (done, (page, spec)) in matches.overlays.into_iter().enumerate() {
            if spec.is_empty() {
                log::debug!("Page {}: matched record has nothing to draw", page);
            } else {
                match composer.compose(&spec) {
                    Ok(bytes) => {
                        overlays.insert(page, bytes);
                    }
                    Err(e) => warnings.push(PageWarning::OverlayMergeDefect {
                        page,
                        reason: e.to_string(),
                    }),
                }
            }
            pages[page].overlay = Some(spec);
            self.report(Stage::Compose, done + 1, total);
        }

        let merged = DocumentMerger::new(self.options.placement).merge(document, &overlays)?;
        self.report(Stage::Merge, document.page_count(), document.page_count());
        for page in merged.applied {
            pages[page].stamped = true;
        }
        warnings.extend(merged.warnings);

        for warning in &warnings {
            match warning {
                PageWarning::OverlayMergeDefect { .. } => {}
                other => log::warn!("{}", other),
            }
        }

        let report = StampReport::new(pages, warnings);
        log::info!(
            "Stamped {} of {} page(s): {} recognized, {} matched, {} warning(s)",
            report.stats.stamped,
            report.stats.page_count,
            report.stats.codes_recognized,
            report.stats.matched,
            report.stats.warning_count
        );

        Ok(StampOutput::new(merged.bytes, report))
    }

    fn rasterize(&self, document: &SourceDocument) -> Result<Vec<RgbImage>> {
        let rasterizer = match &self.rasterizer {
            Some(rasterizer) => rasterizer.clone(),
            None => rasterizer_for(self.options.raster_backend)?,
        };
        log::info!(
            "Rasterizing {} page(s) at {} dpi with {}",
            document.page_count(),
            self.options.dpi,
            rasterizer.name()
        );
        let rasters = rasterizer.rasterize(document, self.options.dpi)?;
        self.report(Stage::Rasterize, rasters.len(), rasters.len());
        Ok(rasters)
    }

    fn recognize(
        &self,
        recognizer: &RegionRecognizer,
        rasters: &[RgbImage],
    ) -> Result<Vec<RegionReading>> {
        let total = rasters.len();
        let done = AtomicUsize::new(0);
        let dpi = self.options.dpi;

        let read = |(page, raster): (usize, &RgbImage)| -> Result<RegionReading> {
            let reading = recognizer.read(raster, dpi)?;
            log::debug!("Page {}: {:?}", page, reading);
            let completed = done.fetch_add(1, Ordering::SeqCst) + 1;
            self.report(Stage::Recognize, completed, total);
            Ok(reading)
        };

        if self.options.parallel {
            rasters.par_iter().enumerate().map(read).collect()
        } else {
            rasters.iter().enumerate().map(read).collect()
        }
    }

    fn recognizer(&self) -> Arc<dyn TextRecognizer> {
        match &self.recognizer {
            Some(recognizer) => recognizer.clone(),
            None => Arc::new(
                TesseractRecognizer::new().with_page_segmentation(self.options.page_segmentation),
            ),
        }
    }

    fn report(&self, stage: Stage, completed: usize, total: usize) {
        if let Some(callback) = &self.progress {
            callback(Progress {
                stage,
                completed,
                total,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::TabularRecord;
    use crate::options::DuplicateKeyPolicy;
    use crate::test_support::{blank_document, page_operations};
    use std::sync::Mutex;

    /// One white raster per page.
    struct BlankRasterizer;

    impl Rasterizer for BlankRasterizer {
        fn name(&self) -> &str {
            "blank"
        }

        fn rasterize(&self, document: &SourceDocument, _dpi: u32) -> Result<Vec<RgbImage>> {
            Ok((0..document.page_count())
                .map(|_| RgbImage::from_pixel(612, 792, image::Rgb([255, 255, 255])))
                .collect())
        }
    }

    /// Returns the queued texts in order, one per call.
    struct QueuedRecognizer {
        texts: Mutex<Vec<String>>,
    }

    impl QueuedRecognizer {
        fn new(texts: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                texts: Mutex::new(texts.iter().rev().map(|t| t.to_string()).collect()),
            })
        }
    }

    impl TextRecognizer for QueuedRecognizer {
        fn name(&self) -> &str {
            "queued"
        }

        fn recognize(&self, _image: &RgbImage, _language: &str) -> Result<String> {
            Ok(self.texts.lock().unwrap().pop().unwrap_or_default())
        }
    }

    struct MissingEngine;

    impl TextRecognizer for MissingEngine {
        fn name(&self) -> &str {
            "missing"
        }

        fn ensure_available(&self, _language: &str) -> Result<()> {
            Err(Error::Recognition("not installed".to_string()))
        }

        fn recognize(&self, _image: &RgbImage, _language: &str) -> Result<String> {
            unreachable!("availability is checked first")
        }
    }

    fn stamper(texts: &[&str]) -> Stamper {
        Stamper::new(StampOptions::default().sequential())
            .with_rasterizer(Arc::new(BlankRasterizer))
            .with_recognizer(QueuedRecognizer::new(texts))
    }

    fn table() -> RecordTable {
        RecordTable::from_records(
            vec![TabularRecord::new(
                "1234",
                Some("Smith".to_string()),
                Some("Jones".to_string()),
                Some("7".to_string()),
            )],
            DuplicateKeyPolicy::FirstWins,
        )
        .unwrap()
    }

    #[test]
    fn test_stamp_matched_page() {
        let document = blank_document(1);
        let output = stamper(&["TOUR 1234 X"]).stamp(&document, &table()).unwrap();

        assert_eq!(output.file_name, OUTPUT_FILE_NAME);
        assert_eq!(output.mime_type, "application/pdf");
        assert_eq!(output.report.stamped_pages(), vec![0]);
        assert!(output.report.warnings.is_empty());

        let merged = SourceDocument::from_bytes(output.bytes).unwrap();
        let texts: Vec<Vec<u8>> = page_operations(&merged, 0)
            .iter()
            .filter(|op| op.operator == "Tj")
            .map(|op| op.operands[0].as_str().unwrap().to_vec())
            .collect();
        assert_eq!(
            texts,
            vec![b"Page 0".to_vec(), b"Smith, Jones".to_vec(), b"E-7".to_vec()]
        );
    }

    #[test]
    fn test_unmatched_and_missing_codes_pass_through() {
        let document = blank_document(2);
        let output = stamper(&["9999", "no number here"])
            .stamp(&document, &table())
            .unwrap();

        assert_eq!(output.bytes, document.bytes());
        assert_eq!(output.report.stats.stamped, 0);
        assert_eq!(
            output.report.warnings,
            vec![
                PageWarning::MatchMiss {
                    page: 0,
                    code: "9999".to_string()
                },
                PageWarning::RecognitionMiss { page: 1 },
            ]
        );
    }

    #[test]
    fn test_scan_reports_progress() {
        let document = blank_document(3);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let readings = stamper(&["1234", "", "5678"])
            .with_progress(move |p| sink.lock().unwrap().push(p))
            .scan(&document)
            .unwrap();

        assert_eq!(readings[0].code(), Some("1234"));
        assert_eq!(readings[1].code(), None);
        assert_eq!(readings[2].code(), Some("5678"));

        let events = events.lock().unwrap();
        assert_eq!(events[0].stage, Stage::Rasterize);
        let recognized: Vec<usize> = events
            .iter()
            .filter(|p| p.stage == Stage::Recognize)
            .map(|p| p.completed)
            .collect();
        assert_eq!(recognized, vec![1, 2, 3]);
    }

    #[test]
    fn test_missing_engine_aborts() {
        let document = blank_document(1);
        let result = Stamper::new(StampOptions::default())
            .with_rasterizer(Arc::new(BlankRasterizer))
            .with_recognizer(Arc::new(MissingEngine))
            .stamp(&document, &table());
        assert!(matches!(result, Err(Error::Recognition(_))));
    }

    #[test]
    fn test_invalid_options_rejected() {
        let document = blank_document(1);
        let result = Stamper::new(StampOptions::default().with_dpi(1))
            .with_rasterizer(Arc::new(BlankRasterizer))
            .with_recognizer(QueuedRecognizer::new(&[]))
            .scan(&document);
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_write_to_uses_fixed_name() {
        let dir = tempfile::tempdir().unwrap();
        let output = StampOutput::new(b"%PDF-1.4\n".to_vec(), StampReport::default());
        let path = output.write_to(dir.path()).unwrap();
        assert!(path.ends_with(OUTPUT_FILE_NAME));
        assert_eq!(std::fs::read(path).unwrap(), b"%PDF-1.4\n");
    }
}
