//! Plain-text extraction for the assist knowledge base.
//!
//! This crate provides:
//! - [`DocumentFormat`] detection from file extensions
//! - Per-format extractors for PDF, DOCX and UTF-8 text
//! - The [`TextExtractor`] seam and its standard [`FileExtractor`] implementation

pub mod docx;
pub mod error;
pub mod extractor;
pub mod format;
pub mod pdf;
pub mod text;

pub use docx::extract_docx;
pub use error::{ExtractError, Result};
pub use extractor::{FileExtractor, TextExtractor, extract_file};
pub use format::DocumentFormat;
pub use pdf::extract_pdf;
pub use text::extract_text;
