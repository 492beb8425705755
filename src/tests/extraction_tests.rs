use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::extraction::{normalize_whitespace, PdfExtractor, EXTRACTION_FAILED_SENTINEL};

fn build_pdf(pages_text: &[&str]) -> Vec<u8> {
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
    for text in pages_text {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 48.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().unwrap(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
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
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

#[test]
fn test_extracts_text_per_page_joined_with_newlines() {
    let pdf = build_pdf(&["Hemoglobin 14.2", "Platelets 250"]);
    let extractor = PdfExtractor::new();

    let text = extractor.extract_text_from_bytes(&pdf);

    assert!(text.contains("Hemoglobin 14.2"));
    assert!(text.contains("Platelets 250"));
    // One segment per page, separated by a single newline.
    assert_eq!(text.lines().count(), 2);
}

#[test]
fn test_invalid_bytes_produce_sentinel() {
    let extractor = PdfExtractor::new();
    let text = extractor.extract_text_from_bytes(b"this is not a pdf");
    assert_eq!(text, EXTRACTION_FAILED_SENTINEL);
}

#[test]
fn test_missing_file_produces_sentinel() {
    let extractor = PdfExtractor::new();
    let text = extractor.extract_text("/nonexistent/path/report.pdf");
    assert_eq!(text, EXTRACTION_FAILED_SENTINEL);
}

#[tokio::test]
async fn test_off_thread_extraction_reads_file() {
    let pdf = build_pdf(&["WBC 6.1"]);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.pdf");
    std::fs::write(&path, &pdf).unwrap();

    let extractor = PdfExtractor::new();
    let text = extractor
        .extract_text_off_thread(path.to_str().unwrap())
        .await;

    assert!(text.contains("WBC 6.1"));
}

#[tokio::test]
async fn test_off_thread_extraction_missing_file_produces_sentinel() {
    let extractor = PdfExtractor::new();
    let text = extractor
        .extract_text_off_thread("/nonexistent/path/report.pdf")
        .await;
    assert_eq!(text, EXTRACTION_FAILED_SENTINEL);
}

#[test]
fn test_normalize_whitespace_collapses_runs() {
    assert_eq!(normalize_whitespace("  a   b\n\nc\t d  "), "a b c d");
    assert_eq!(normalize_whitespace(""), "");
    assert_eq!(normalize_whitespace("   \n\t "), "");
}
