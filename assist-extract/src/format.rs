//! Supported document formats and extension detection.

use std::fmt;
use std::path::Path;

/// A document format the extractor knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    /// Portable Document Format (`.pdf`).
    Pdf,
    /// Office Open XML word-processing document (`.docx`).
    Docx,
    /// UTF-8 plain text (`.txt`).
    Text,
}

impl DocumentFormat {
    /// Every supported format.
    pub const ALL: [DocumentFormat; 3] = [Self::Pdf, Self::Docx, Self::Text];

    /// Detect the format from a path's extension, ignoring ASCII case.
    ///
    /// Returns `None` for any other extension, or when the path has none.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension().and_then(|ext| ext.to_str()).and_then(Self::from_extension)
    }

    /// Detect the format from a bare extension such as `"pdf"`.
    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|format| ext.eq_ignore_ascii_case(format.extension()))
    }

    /// The canonical lower-case extension for this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Text => "txt",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_supported_extensions_case_insensitively() {
        assert_eq!(DocumentFormat::from_path(Path::new("a/report.pdf")), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::from_path(Path::new("Report.PDF")), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::from_path(Path::new("memo.docx")), Some(DocumentFormat::Docx));
        assert_eq!(DocumentFormat::from_path(Path::new("notes.TxT")), Some(DocumentFormat::Text));
    }

    #[test]
    fn rejects_unknown_or_missing_extensions() {
        assert_eq!(DocumentFormat::from_path(Path::new("legacy.doc")), None);
        assert_eq!(DocumentFormat::from_path(Path::new("README")), None);
        assert_eq!(DocumentFormat::from_path(Path::new("archive.pdf.gz")), None);
    }

    #[test]
    fn display_is_extension() {
        assert_eq!(DocumentFormat::Docx.to_string(), "docx");
    }
}
