//! Text extraction from images.
//!
//! The indexer only needs [`TextExtractor`]; OCR itself runs elsewhere.
//! Two implementations ship with the crate: the `tesseract` command-line tool
//! and pre-extracted sidecar text files.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// External tool ran but reported failure
    #[error("{program} exited with {status}: {stderr}")]
    Tool {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("{0}")]
    Other(String),
}

/// Turns one image into text. Calls are independent and may run concurrently
/// for different files.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, image: &Path) -> Result<String, ExtractError>;
}

impl<F> TextExtractor for F
where
    F: Fn(&Path) -> Result<String, ExtractError> + Send + Sync,
{
    fn extract(&self, image: &Path) -> Result<String, ExtractError> {
        self(image)
    }
}

// ─── Tesseract ──────────────────────────────────────────────────────

/// Runs `tesseract <image> stdout -l <lang> [--tessdata-dir <dir>]`.
#[derive(Debug, Clone)]
pub struct TesseractExtractor {
    program: PathBuf,
    tessdata: Option<PathBuf>,
    lang: String,
}

impl Default for TesseractExtractor {
    fn default() -> Self {
        Self {
            program: PathBuf::from("tesseract"),
            tessdata: None,
            lang: "eng".to_string(),
        }
    }
}

impl TesseractExtractor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), ..Self::default() }
    }

    pub fn with_tessdata(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tessdata = Some(dir.into());
        self
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    fn args(&self, image: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            image.as_os_str().to_owned(),
            "stdout".into(),
            "-l".into(),
            self.lang.clone().into(),
        ];
        if let Some(ref dir) = self.tessdata {
            args.push("--tessdata-dir".into());
            args.push(dir.as_os_str().to_owned());
        }
        args
    }
}

impl TextExtractor for TesseractExtractor {
    fn extract(&self, image: &Path) -> Result<String, ExtractError> {
        let output = Command::new(&self.program).args(self.args(image)).output()?;
        if !output.status.success() {
            return Err(ExtractError::Tool {
                program: self.program.display().to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(image = %image.display(), chars = text.len(), "tesseract done");
        Ok(text)
    }
}

// ─── Sidecar text ───────────────────────────────────────────────────

/// Reads text that was extracted ahead of time into `<image><suffix>`
/// (default suffix `.txt`, so `scan.png` → `scan.png.txt`).
#[derive(Debug, Clone)]
pub struct SidecarExtractor {
    suffix: String,
}

impl Default for SidecarExtractor {
    fn default() -> Self {
        Self { suffix: ".txt".to_string() }
    }
}

impl SidecarExtractor {
    pub fn with_suffix(suffix: impl Into<String>) -> Self {
        Self { suffix: suffix.into() }
    }

    pub fn sidecar_path(&self, image: &Path) -> PathBuf {
        let mut name = image.as_os_str().to_owned();
        name.push(&self.suffix);
        PathBuf::from(name)
    }
}

impl TextExtractor for SidecarExtractor {
    fn extract(&self, image: &Path) -> Result<String, ExtractError> {
        let raw = std::fs::read(self.sidecar_path(image))?;
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }
}
