use tempfile::TempDir;

use crate::services::file_service::{has_pdf_extension, is_pdf_payload, FileService};

fn temp_service() -> (TempDir, FileService) {
    let dir = TempDir::new().unwrap();
    let service = FileService::new(dir.path().to_string_lossy().to_string());
    (dir, service)
}

#[tokio::test]
async fn test_save_uses_generated_pdf_filename() {
    let (_dir, service) = temp_service();

    let (filename, path) = service.save_report_file(b"%PDF-1.4 test").await.unwrap();

    assert!(filename.starts_with("blood_report_"));
    assert!(filename.ends_with(".pdf"));
    assert!(service.file_exists(&path));
}

#[tokio::test]
async fn test_saved_file_roundtrip() {
    let (_dir, service) = temp_service();
    let data = b"%PDF-1.4 content bytes";

    let (_filename, path) = service.save_report_file(data).await.unwrap();
    let read_back = service.read_file(&path).await.unwrap();

    assert_eq!(read_back, data);
}

#[tokio::test]
async fn test_two_uploads_never_collide() {
    let (_dir, service) = temp_service();

    let (first, _) = service.save_report_file(b"one").await.unwrap();
    let (second, _) = service.save_report_file(b"two").await.unwrap();

    assert_ne!(first, second);
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let (_dir, service) = temp_service();

    let (_filename, path) = service.save_report_file(b"data").await.unwrap();
    service.delete_file(&path).await.unwrap();
    assert!(!service.file_exists(&path));

    // Deleting again is not an error.
    service.delete_file(&path).await.unwrap();
}

#[test]
fn test_pdf_extension_check() {
    assert!(has_pdf_extension("report.pdf"));
    assert!(has_pdf_extension("REPORT.PDF"));
    assert!(has_pdf_extension("my.blood.report.pdf"));
    assert!(!has_pdf_extension("report.docx"));
    assert!(!has_pdf_extension("report"));
    assert!(!has_pdf_extension(""));
}

#[test]
fn test_pdf_magic_byte_check() {
    assert!(is_pdf_payload(b"%PDF-1.7\n...rest of document"));
    assert!(!is_pdf_payload(b"plain text pretending to be a report"));
    assert!(!is_pdf_payload(b""));
}
