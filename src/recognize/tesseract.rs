//! Tesseract OCR through its command line interface.

use std::path::PathBuf;
use std::process::Command;

use image::{ImageFormat, RgbImage};

use crate::error::{Error, Result};

use super::TextRecognizer;

/// Runs `tesseract <image> stdout -l <language>` per region.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    program: PathBuf,
    page_segmentation: Option<u8>,
}

impl TesseractRecognizer {
    pub fn new() -> Self {
        Self::with_program("tesseract")
    }

    /// Use a specific `tesseract` executable.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            page_segmentation: None,
        }
    }

    /// Pass `--psm <mode>` to tesseract.
    pub fn with_page_segmentation(mut self, psm: Option<u8>) -> Self {
        self.page_segmentation = psm;
        self
    }

    /// Languages tesseract has trained data for.
    pub fn list_languages(&self) -> Result<Vec<String>> {
        let output = Command::new(&self.program)
            .arg("--list-langs")
            .output()
            .map_err(|e| self.launch_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Recognition(format!(
                "tesseract --list-langs failed: {}",
                stderr.trim()
            )));
        }

        // Older releases print the list on stderr.
        let mut listing = String::from_utf8_lossy(&output.stdout).into_owned();
        listing.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(parse_language_list(&listing))
    }

    fn launch_error(&self, e: std::io::Error) -> Error {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::Recognition(format!(
                "{} not found (is tesseract-ocr installed?)",
                self.program.display()
            ))
        } else {
            Error::Recognition(format!("failed to run {}: {}", self.program.display(), e))
        }
    }
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn ensure_available(&self, language: &str) -> Result<()> {
        let available = self.list_languages()?;
        // "deu+eng" combines several models
        let missing: Vec<&str> = language
            .split('+')
            .map(str::trim)
            .filter(|lang| !available.iter().any(|a| a == lang))
            .collect();

        if !missing.is_empty() {
            return Err(Error::Recognition(format!(
                "tesseract has no trained data for: {} (available: {})",
                missing.join(", "),
                available.join(", ")
            )));
        }
        Ok(())
    }

    fn recognize(&self, image: &RgbImage, language: &str) -> Result<String> {
        let mut scratch = tempfile::Builder::new()
            .prefix("ocrstamp-region-")
            .suffix(".png")
            .tempfile()?;
        image
            .write_to(scratch.as_file_mut(), ImageFormat::Png)
            .map_err(|e| Error::EngineFailure(format!("failed to encode region: {}", e)))?;

        let mut command = Command::new(&self.program);
        command.arg(scratch.path()).arg("stdout").arg("-l").arg(language);
        if let Some(psm) = self.page_segmentation {
            command.arg("--psm").arg(psm.to_string());
        }

        let output = command.output().map_err(|e| self.launch_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::EngineFailure(format!(
                "tesseract exited with status {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Parse `tesseract --list-langs` output.
fn parse_language_list(listing: &str) -> Vec<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("List of available languages"))
        .filter(|line| !line.contains(' '))
        .map(str::to_string)
        .collect()
}
