//! DOCX text extraction.
//!
//! A `.docx` file is a zip container; the body lives in `word/document.xml`.
//! Paragraph text is collected from `w:t` runs, with run-level `w:tab` and
//! `w:br` mapped to their whitespace equivalents.

use std::io::Read;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::debug;

use crate::error::{ExtractError, Result};

const DOCUMENT_PART: &str = "word/document.xml";

/// Extract every paragraph in document order, joined by newlines.
pub fn extract_docx(path: &Path) -> Result<String> {
    let file = std::fs::File::open(path).map_err(|e| ExtractError::io(path, e))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| ExtractError::malformed(path, format!("not a zip container: {e}")))?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| ExtractError::malformed(path, format!("missing {DOCUMENT_PART}: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractError::malformed(path, format!("unreadable {DOCUMENT_PART}: {e}")))?;

    let paragraphs = paragraphs_from_xml(&xml)
        .map_err(|e| ExtractError::malformed(path, format!("invalid {DOCUMENT_PART}: {e}")))?;

    debug!(path = %path.display(), paragraph_count = paragraphs.len(), "extracted DOCX");
    Ok(paragraphs.join("\n"))
}

/// Parse WordprocessingML and return the text of each `w:p` element.
///
/// Paragraphs nested in text boxes are emitted before the paragraph that
/// anchors them. Only the `mc:Choice` branch of an `mc:AlternateContent`
/// block is read; its `mc:Fallback` repeats the same content for older
/// readers.
pub fn paragraphs_from_xml(xml: &str) -> std::result::Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut open: Vec<String> = Vec::new();
    // Depth counters: text boxes nest paragraphs (and runs) inside runs.
    let mut runs = 0usize;
    let mut properties = 0usize;
    let mut fallback = 0usize;
    let mut in_text_run = false;

    loop {
        let event = reader.read_event()?;
        if fallback > 0 {
            match event {
                Event::Start(_) => fallback += 1,
                Event::End(_) => fallback -= 1,
                Event::Eof => break,
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(e) => match e.name().as_ref() {
                b"mc:Fallback" => fallback = 1,
                b"w:p" => open.push(String::new()),
                b"w:r" => runs += 1,
                b"w:pPr" | b"w:rPr" => properties += 1,
                b"w:t" => in_text_run = true,
                _ => {}
            },
            Event::Empty(e) => {
                // Tab stops under w:pPr/w:tabs share the w:tab name with run content.
                let in_run_content = runs > 0 && properties == 0;
                match (e.name().as_ref(), open.last_mut()) {
                    (b"w:p", _) => paragraphs.push(String::new()),
                    (b"w:tab", Some(p)) if in_run_content => p.push('\t'),
                    (b"w:br" | b"w:cr", Some(p)) if in_run_content => p.push('\n'),
                    _ => {}
                }
            }
            Event::Text(t) if in_text_run => {
                if let Some(p) = open.last_mut() {
                    p.push_str(&t.unescape()?);
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:r" => runs = runs.saturating_sub(1),
                b"w:pPr" | b"w:rPr" => properties = properties.saturating_sub(1),
                b"w:p" => {
                    if let Some(p) = open.pop() {
                        paragraphs.push(p);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}
