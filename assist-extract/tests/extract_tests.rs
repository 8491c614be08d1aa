//! End-to-end extraction over generated PDF, DOCX and text fixtures.

use std::io::Write;
use std::path::Path;

use assist_extract::{ExtractError, FileExtractor, TextExtractor, extract_file};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

/// Write a PDF with one page per entry; `None` produces a page with no text
/// operators, which is what a scanned image page looks like to a text extractor.
fn write_pdf(path: &Path, pages: &[Option<&str>]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for page in pages {
        let operations = match page {
            Some(text) => vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
            None => Vec::new(),
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

const WORDML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

fn write_docx(path: &Path, paragraphs: &[&str]) {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t xml:space=\"preserve\">{p}</w:t></w:r></w:p>"))
        .collect();
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{WORDML_NS}"><w:body>{body}<w:sectPr/></w:body></w:document>"#
    );

    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    zip.start_file("[Content_Types].xml", options).unwrap();
    let content_types = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="{CONTENT_TYPES_NS}"/>"#
    );
    zip.write_all(content_types.as_bytes()).unwrap();
    zip.start_file("word/document.xml", options).unwrap();
    zip.write_all(document.as_bytes()).unwrap();
    zip.finish().unwrap();
}

#[test]
fn docx_paragraphs_are_newline_joined() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memo.docx");
    write_docx(&path, &["Alpha.", "Beta."]);

    assert_eq!(extract_file(&path).unwrap(), "Alpha.\nBeta.");
}

#[test]
fn pdf_blank_page_contributes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scan.pdf");
    write_pdf(&path, &[Some("First page"), None, Some("Third page")]);

    let text = extract_file(&path).unwrap();
    assert!(text.contains("First page"), "missing page 1 in {text:?}");
    assert!(text.contains("Third page"), "missing page 3 in {text:?}");
    let first = text.find("First page").unwrap();
    let third = text.find("Third page").unwrap();
    assert!(first < third, "pages out of order in {text:?}");
    assert!(!text.contains("\n\n"), "blank page left an empty line in {text:?}");
}

#[test]
fn image_only_pdf_extracts_to_empty_string() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("all_scans.pdf");
    write_pdf(&path, &[None, None]);

    assert_eq!(extract_file(&path).unwrap(), "");
}

#[test]
fn empty_text_file_is_a_valid_result() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.txt");
    std::fs::write(&path, "").unwrap();

    assert_eq!(extract_file(&path).unwrap(), "");
}

#[test]
fn docx_without_document_part_is_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hollow.docx");
    let file = std::fs::File::create(&path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    zip.start_file("word/styles.xml", zip::write::SimpleFileOptions::default()).unwrap();
    zip.write_all(b"<w:styles/>").unwrap();
    zip.finish().unwrap();

    let err = extract_file(&path).unwrap_err();
    assert!(matches!(err, ExtractError::Malformed { .. }), "got {err:?}");
    assert_eq!(err.path(), path.as_path());
}

#[test]
fn plain_bytes_named_docx_are_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fake.docx");
    std::fs::write(&path, "just text").unwrap();

    assert!(matches!(extract_file(&path).unwrap_err(), ExtractError::Malformed { .. }));
}

#[tokio::test]
async fn async_extractor_reads_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("single.pdf");
    write_pdf(&path, &[Some("Quarterly report")]);

    let text = FileExtractor::new().extract(&path).await.unwrap();
    assert_eq!(text.trim(), "Quarterly report");
}

#[tokio::test]
async fn async_extractor_rejects_unsupported_type() {
    let err = FileExtractor::new().extract(Path::new("photo.jpeg")).await.unwrap_err();
    assert!(matches!(err, ExtractError::UnsupportedFormat { .. }));
}
