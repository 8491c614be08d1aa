//! Error types for the `assist-rag` crate.

use std::path::PathBuf;

use assist_extract::ExtractError;
use thiserror::Error;

/// Errors that can occur in ingestion and retrieval.
#[derive(Debug, Error)]
pub enum RagError {
    /// The file extension is not supported; nothing was read.
    #[error("Unsupported file type '{extension}': {}", path.display())]
    UnsupportedFormat {
        /// The rejected file.
        path: PathBuf,
        /// The extension found on the path.
        extension: String,
    },

    /// The file could not be read or parsed.
    #[error("Extraction error: {0}")]
    Extraction(#[source] ExtractError),

    /// The text to ingest is empty or whitespace-only. Nothing was stored.
    #[error("Document has no usable text")]
    EmptyDocument,

    /// A search was issued against an empty index.
    ///
    /// This is an empty-state signal rather than a fault.
    #[error("No documents found; ingest a file first")]
    NoDocuments,

    /// The vector buffer and the document store disagree.
    ///
    /// Fatal for the current operation; never retried or masked.
    #[error("Index corruption: {0}")]
    IndexCorruption(String),

    /// A query asked for zero results.
    #[error("top_k must be at least 1")]
    InvalidTopK,

    /// An embedding provider returned a vector of the wrong length.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The dimension the index was configured with.
        expected: usize,
        /// The dimension that was produced or found.
        actual: usize,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A snapshot file could not be read or written.
    #[error("Snapshot error ({}): {message}", path.display())]
    Snapshot {
        /// The snapshot path.
        path: PathBuf,
        /// A description of the failure.
        message: String,
    },
}

impl RagError {
    /// Whether this error is the empty-index signal rather than a failure.
    pub fn is_no_documents(&self) -> bool {
        matches!(self, Self::NoDocuments)
    }
}

impl From<ExtractError> for RagError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::UnsupportedFormat { path, extension } => {
                Self::UnsupportedFormat { path, extension }
            }
            other => Self::Extraction(other),
        }
    }
}

/// A convenience result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_extract_error_is_lifted() {
        let err: RagError = ExtractError::UnsupportedFormat {
            path: PathBuf::from("deck.pptx"),
            extension: "pptx".into(),
        }
        .into();
        assert!(matches!(
            err,
            RagError::UnsupportedFormat { ref extension, .. } if extension == "pptx"
        ));
    }

    #[test]
    fn other_extract_errors_are_wrapped_with_source() {
        let err: RagError = ExtractError::Malformed {
            path: PathBuf::from("bad.pdf"),
            message: "failed to load PDF".into(),
        }
        .into();
        assert!(matches!(err, RagError::Extraction(_)));
        assert!(err.to_string().contains("bad.pdf"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn no_documents_is_flagged() {
        assert!(RagError::NoDocuments.is_no_documents());
        assert!(!RagError::EmptyDocument.is_no_documents());
    }

    #[test]
    fn dimension_mismatch_display() {
        let err = RagError::DimensionMismatch { expected: 384, actual: 768 };
        assert_eq!(err.to_string(), "Embedding dimension mismatch: expected 384, got 768");
    }
}
