//! Text extraction from uploaded documents.
//!
//! Plain-text files are decoded as UTF-8. PDF files are parsed with `lopdf` and the text of
//! every page is concatenated in page order. Anything else is rejected.

use crate::error::{Result, SvarError};
use std::path::Path;
use tracing::{debug, instrument};

/// Supported document kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    PlainText,
    Pdf,
}

impl DocumentKind {
    /// Detect the kind from a file name's extension (case-insensitive).
    pub fn from_filename(filename: &str) -> Result<Self> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "txt" => Ok(DocumentKind::PlainText),
            "pdf" => Ok(DocumentKind::Pdf),
            "" => Err(SvarError::UnsupportedDocument(format!(
                "'{}' has no file extension",
                filename
            ))),
            other => Err(SvarError::UnsupportedDocument(format!(".{}", other))),
        }
    }
}

/// Extract the text of an uploaded document.
#[instrument(skip(bytes), fields(len = bytes.len()))]
pub fn extract_text(filename: &str, bytes: &[u8]) -> Result<String> {
    match DocumentKind::from_filename(filename)? {
        DocumentKind::PlainText => decode_plain_text(bytes),
        DocumentKind::Pdf => extract_pdf_text(bytes),
    }
}

fn decode_plain_text(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| SvarError::DocumentExtraction(format!("File is not valid UTF-8: {}", e)))
}

/// Concatenate the text of every page, in page order.
fn extract_pdf_text(bytes: &[u8]) -> Result<String> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| SvarError::DocumentExtraction(format!("Invalid PDF: {}", e)))?;

    // get_pages is keyed by 1-based page number, so iteration is in document order
    let pages = doc.get_pages();
    debug!("Extracting text from {} pages", pages.len());

    let mut text = String::new();
    for page_number in pages.keys() {
        let page_text = doc.extract_text(&[*page_number]).map_err(|e| {
            SvarError::DocumentExtraction(format!("Page {}: {}", page_number, e))
        })?;
        text.push_str(&page_text);
    }

    Ok(text)
}
