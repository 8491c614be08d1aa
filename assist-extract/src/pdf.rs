//! PDF text extraction.
//!
//! Uses lopdf to walk the page tree and decode each page's text operators.
//! Image-only pages (scans) carry no text operators and contribute nothing to
//! the output, so a scanned PDF can extract to a partial or empty string
//! without an error.

use std::path::Path;

use lopdf::Document;
use tracing::{debug, warn};

use crate::error::{ExtractError, Result};

/// Extract the text of every page in page order, joined by newlines.
pub fn extract_pdf(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| ExtractError::io(path, e))?;
    let doc = Document::load_mem(&bytes)
        .map_err(|e| ExtractError::malformed(path, format!("failed to load PDF: {e}")))?;

    let pages = doc.get_pages();
    let mut texts = Vec::with_capacity(pages.len());

    // get_pages is a BTreeMap keyed by 1-based page number, so iteration is in page order.
    for &page_num in pages.keys() {
        match doc.extract_text(&[page_num]) {
            Ok(text) => {
                let text = text.trim_end_matches(['\n', '\r']);
                if text.trim().is_empty() {
                    debug!(path = %path.display(), page = page_num, "page has no extractable text");
                    continue;
                }
                texts.push(text.to_string());
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    page = page_num,
                    error = %e,
                    "skipping undecodable page"
                );
            }
        }
    }

    debug!(
        path = %path.display(),
        page_count = pages.len(),
        text_pages = texts.len(),
        "extracted PDF"
    );
    Ok(texts.join("\n"))
}
