use lopdf::Document;
use tracing::{debug, error, warn};

/// Returned in place of extracted text when a document yields nothing, so the
/// analysis step can still run with a degraded prompt instead of aborting.
pub const EXTRACTION_FAILED_SENTINEL: &str =
    "Blood test report content could not be extracted from PDF.";

/// Pulls plain text out of stored PDF reports, page by page.
#[derive(Clone, Default)]
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract text from a stored PDF. Pages are extracted independently;
    /// a page that fails to decode is logged and skipped. A document that
    /// yields no text at all produces the sentinel string rather than an
    /// error.
    pub fn extract_text(&self, file_path: &str) -> String {
        match Document::load(file_path) {
            Ok(doc) => self.extract_from_document(&doc, file_path),
            Err(e) => {
                warn!("Failed to open PDF {}: {}", file_path, e);
                EXTRACTION_FAILED_SENTINEL.to_string()
            }
        }
    }

    /// Extract text from a stored PDF on a blocking thread. Parsing is
    /// CPU-bound and can take seconds for large documents, so it must not
    /// run on the async executor.
    pub async fn extract_text_off_thread(&self, file_path: &str) -> String {
        let extractor = self.clone();
        let path = file_path.to_string();
        match tokio::task::spawn_blocking(move || extractor.extract_text(&path)).await {
            Ok(text) => text,
            Err(e) => {
                error!("PDF extraction task failed: {}", e);
                EXTRACTION_FAILED_SENTINEL.to_string()
            }
        }
    }

    /// Extract text from in-memory PDF bytes. Used by tests and by callers
    /// that already hold the upload buffer.
    pub fn extract_text_from_bytes(&self, data: &[u8]) -> String {
        match Document::load_mem(data) {
            Ok(doc) => self.extract_from_document(&doc, "<memory>"),
            Err(e) => {
                warn!("Failed to parse PDF from memory: {}", e);
                EXTRACTION_FAILED_SENTINEL.to_string()
            }
        }
    }

    fn extract_from_document(&self, doc: &Document, source: &str) -> String {
        let pages = doc.get_pages();
        let mut segments: Vec<String> = Vec::with_capacity(pages.len());

        for (page_number, _page_id) in pages.iter() {
            match doc.extract_text(&[*page_number]) {
                Ok(content) => {
                    let cleaned = normalize_whitespace(&content);
                    if !cleaned.is_empty() {
                        segments.push(cleaned);
                    }
                }
                Err(e) => {
                    warn!(
                        "Error extracting text from page {} of {}: {}",
                        page_number, source, e
                    );
                    continue;
                }
            }
        }

        if segments.is_empty() {
            debug!("No extractable text in {}", source);
            return EXTRACTION_FAILED_SENTINEL.to_string();
        }

        segments.join("\n")
    }
}

/// Collapse runs of whitespace (including line breaks inside a page) into
/// single spaces and trim the result.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
