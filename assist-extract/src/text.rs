//! Plain-text extraction.

use std::path::Path;

use crate::error::{ExtractError, Result};

/// Read a `.txt` file verbatim as UTF-8.
pub fn extract_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| ExtractError::io(path, e))?;
    String::from_utf8(bytes)
        .map_err(|source| ExtractError::Encoding { path: path.to_path_buf(), source })
}
