// analysis-service-rs/src/extract.rs
// Text extraction from uploaded documents
//
// PDF uploads are parsed page by page with lopdf; everything else is
// treated as UTF-8 text. Extraction never fails upward: a document we
// cannot read yields an empty string, and the caller decides how to
// report that.

use lopdf::Document;

/// Extract plain text from an uploaded file.
///
/// Files whose name ends in `.pdf` (case-insensitive) go through the PDF
/// parser; all other files are decoded as UTF-8 with invalid sequences
/// replaced rather than rejected.
pub fn extract_text(file_name: &str, bytes: &[u8]) -> String {
    if file_name.to_lowercase().ends_with(".pdf") {
        extract_text_from_pdf(bytes)
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

/// Extract text from a PDF byte stream, page by page.
///
/// Pages that yield no text contribute nothing; successful pages are
/// joined with newlines in page order. A document that cannot be loaded
/// at all produces an empty string (logged, not raised).
fn extract_text_from_pdf(bytes: &[u8]) -> String {
    let document = match Document::load_mem(bytes) {
        Ok(doc) => doc,
        Err(e) => {
            log::warn!("Error reading PDF: {}", e);
            return String::new();
        }
    };

    let mut pages_text: Vec<String> = Vec::new();
    for (page_number, _) in document.get_pages() {
        match document.extract_text(&[page_number]) {
            Ok(text) => {
                let text = text.trim_end().to_string();
                if !text.is_empty() {
                    pages_text.push(text);
                }
            }
            Err(e) => {
                log::debug!("Skipping page {}: {}", page_number, e);
            }
        }
    }

    pages_text.join("\n")
}
