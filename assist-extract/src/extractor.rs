//! Format dispatch and the async extractor seam.

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::docx::extract_docx;
use crate::error::{ExtractError, Result};
use crate::format::DocumentFormat;
use crate::pdf::extract_pdf;
use crate::text::extract_text;

/// Something that turns a stored file into a single text blob.
///
/// The knowledge base depends on this trait rather than on [`FileExtractor`]
/// directly, so hosts can plug in OCR or remote extraction.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract the readable text of the file at `path`.
    ///
    /// Empty or whitespace-only output is a valid result.
    async fn extract(&self, path: &Path) -> Result<String>;

    /// Whether this extractor handles the file at `path`, judged by name only.
    fn supports(&self, path: &Path) -> bool {
        DocumentFormat::from_path(path).is_some()
    }
}

/// The standard extractor for `.pdf`, `.docx` and `.txt` files.
///
/// Parsing is CPU-bound and uses blocking file I/O, so [`TextExtractor::extract`]
/// runs it on the blocking thread pool.
///
/// # Example
///
/// ```rust,ignore
/// use assist_extract::{FileExtractor, TextExtractor};
///
/// let text = FileExtractor::new().extract(Path::new("uploads/report.pdf")).await?;
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct FileExtractor;

impl FileExtractor {
    /// Create a new extractor.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextExtractor for FileExtractor {
    async fn extract(&self, path: &Path) -> Result<String> {
        // Reject before handing anything to the blocking pool.
        detect_format(path)?;

        let owned = path.to_path_buf();
        tokio::task::spawn_blocking(move || extract_file(&owned)).await.map_err(|e| {
            error!(path = %path.display(), error = %e, "extraction worker failed");
            ExtractError::Worker { path: path.to_path_buf(), message: e.to_string() }
        })?
    }
}

/// Extract text from `path` synchronously, dispatching on its extension.
///
/// # Errors
///
/// Returns [`ExtractError::UnsupportedFormat`] without touching the file when
/// the extension is not `.pdf`, `.docx` or `.txt`.
pub fn extract_file(path: &Path) -> Result<String> {
    let format = detect_format(path)?;
    debug!(path = %path.display(), %format, "extracting text");
    match format {
        DocumentFormat::Pdf => extract_pdf(path),
        DocumentFormat::Docx => extract_docx(path),
        DocumentFormat::Text => extract_text(path),
    }
}

fn detect_format(path: &Path) -> Result<DocumentFormat> {
    DocumentFormat::from_path(path).ok_or_else(|| ExtractError::UnsupportedFormat {
        path: path.to_path_buf(),
        extension: path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_extension_is_rejected_without_reading() {
        // The file does not exist: an Io error here would mean we tried to open it.
        let err = extract_file(Path::new("/nowhere/slides.pptx")).unwrap_err();
        match err {
            ExtractError::UnsupportedFormat { extension, .. } => assert_eq!(extension, "pptx"),
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
    }

    #[test]
    fn missing_extension_reports_empty_extension() {
        let err = extract_file(Path::new("Makefile")).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::UnsupportedFormat { ref extension, .. } if extension.is_empty()
        ));
    }

    #[tokio::test]
    async fn async_extract_dispatches_to_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.TXT");
        std::fs::write(&path, "remember the milk").unwrap();
        let text = FileExtractor::new().extract(&path).await.unwrap();
        assert_eq!(text, "remember the milk");
    }
}
