//! Rasterization through `pdftoppm` (poppler-utils).

use std::path::{Path, PathBuf};
use std::process::Command;

use image::RgbImage;

use crate::error::{Error, Result};
use crate::model::SourceDocument;

use super::{ensure_page_count, Rasterizer};

/// File name prefix of rendered pages inside the scratch directory.
const PAGE_PREFIX: &str = "page";

/// Renders pages by running `pdftoppm -r <dpi> -png`.
///
/// The document is written to a scratch directory that is removed when
/// rendering finishes, successful or not.
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    program: PathBuf,
}

impl PdftoppmRasterizer {
    pub fn new() -> Self {
        Self::with_program("pdftoppm")
    }

    /// Use a specific `pdftoppm` executable.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Check if the configured pdftoppm can be launched.
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("-v")
            .output()
            .map(|o| o.status.success() || !o.stderr.is_empty())
            .unwrap_or(false)
    }
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer for PdftoppmRasterizer {
    fn name(&self) -> &str {
        "pdftoppm"
    }

    fn rasterize(&self, document: &SourceDocument, dpi: u32) -> Result<Vec<RgbImage>> {
        if document.page_count() == 0 {
            return Ok(Vec::new());
        }

        let scratch = tempfile::tempdir()?;
        let input = scratch.path().join("input.pdf");
        std::fs::write(&input, document.bytes())?;

        let output = Command::new(&self.program)
            .arg("-r")
            .arg(dpi.to_string())
            .arg("-png")
            .arg(&input)
            .arg(scratch.path().join(PAGE_PREFIX))
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::Raster(format!(
                        "{} not found (is poppler-utils installed?)",
                        self.program.display()
                    ))
                } else {
                    Error::Raster(format!("failed to run {}: {}", self.program.display(), e))
                }
            })?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::DocumentFormat(format!(
                "pdftoppm exited with status {}: {}",
                code,
                stderr.trim()
            )));
        }

        let pages = rendered_pages(scratch.path())?;
        log::debug!("pdftoppm rendered {} page(s) at {} dpi", pages.len(), dpi);

        let images = pages
            .iter()
            .map(|(_, path)| Ok(image::open(path)?.to_rgb8()))
            .collect::<Result<Vec<_>>>()?;

        ensure_page_count(self.name(), document, &images)?;
        Ok(images)
    }
}

/// Collect `page-<n>.png` files sorted by page number.
///
/// pdftoppm zero-pads the number to the width of the page count, so the
/// number is parsed rather than relying on name order.
fn rendered_pages(dir: &Path) -> Result<Vec<(usize, PathBuf)>> {
    let mut pages: Vec<(usize, PathBuf)> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter_map(|path| {
            let number = page_number(&path)?;
            Some((number, path))
        })
        .collect();
    pages.sort_by_key(|(number, _)| *number);
    Ok(pages)
}

fn page_number(path: &Path) -> Option<usize> {
    if path.extension()? != "png" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    stem.strip_prefix(PAGE_PREFIX)?
        .strip_prefix('-')?
        .parse()
        .ok()
}
