//! Error types for the `assist-extract` crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while extracting text from a file.
///
/// Every variant carries the path of the file being extracted so callers can
/// report which upload failed.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The file extension is not one of `.pdf`, `.docx` or `.txt`.
    ///
    /// Returned before the file is opened.
    #[error("unsupported file type '{extension}': {}", path.display())]
    UnsupportedFormat {
        /// The file that was rejected.
        path: PathBuf,
        /// The extension found on the path (empty if there was none).
        extension: String,
    },

    /// The file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// The file being read.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A text file is not valid UTF-8.
    #[error("{} is not valid UTF-8: {source}", path.display())]
    Encoding {
        /// The file being decoded.
        path: PathBuf,
        /// The decoding failure.
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// A PDF or DOCX container is corrupt or structurally invalid.
    #[error("malformed document {}: {message}", path.display())]
    Malformed {
        /// The file being parsed.
        path: PathBuf,
        /// A description of the parse failure.
        message: String,
    },

    /// The blocking extraction worker panicked or was cancelled.
    #[error("extraction worker for {} failed: {message}", path.display())]
    Worker {
        /// The file being extracted.
        path: PathBuf,
        /// A description of the join failure.
        message: String,
    },
}

impl ExtractError {
    /// The path of the file this error refers to.
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::UnsupportedFormat { path, .. }
            | Self::Io { path, .. }
            | Self::Encoding { path, .. }
            | Self::Malformed { path, .. }
            | Self::Worker { path, .. } => path,
        }
    }

    pub(crate) fn malformed(path: &std::path::Path, message: impl Into<String>) -> Self {
        Self::Malformed { path: path.to_path_buf(), message: message.into() }
    }

    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io { path: path.to_path_buf(), source }
    }
}

/// A convenience result type for extraction.
pub type Result<T> = std::result::Result<T, ExtractError>;
