//! Built-in content extraction.
//!
//! Turns raw object bytes into plain text for indexing. PDFs go through
//! `pdf-extract`; everything else is treated as text and decoded lossily.
//! Hosts with richer needs (OOXML, OCR) supply their own
//! [`ContentExtractor`] implementation.

use std::collections::BTreeMap;

use crate::errors::SyncError;
use crate::traits::{ContentExtractor, Extracted};

/// Default extractor: PDF plus plain text, selected by file extension.
#[derive(Debug, Default)]
pub struct BuiltinExtractor;

impl ContentExtractor for BuiltinExtractor {
    fn extract(&self, bytes: &[u8], key: &str) -> Result<Extracted, SyncError> {
        let content_type = detect_content_type(key);

        let text = if content_type == "application/pdf" {
            pdf_extract::extract_text_from_mem(bytes)
                .map_err(|e| SyncError::Extract(e.to_string()))?
        } else {
            String::from_utf8_lossy(bytes).to_string()
        };

        let mut metadata = BTreeMap::new();
        metadata.insert("content_type".to_string(), content_type.to_string());

        Ok(Extracted { text, metadata })
    }
}

/// Detect MIME content type from a file extension.
fn detect_content_type(key: &str) -> &'static str {
    match key.rsplit('.').next() {
        Some("pdf") => "application/pdf",
        Some("md") => "text/markdown",
        Some("json") => "application/json",
        Some("yaml" | "yml") => "text/yaml",
        Some("html" | "htm") => "text/html",
        _ => "text/plain",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_passthrough() {
        let extracted = BuiltinExtractor
            .extract(b"hello world", "notes/readme.txt")
            .unwrap();
        assert_eq!(extracted.text, "hello world");
        assert_eq!(
            extracted.metadata.get("content_type").map(String::as_str),
            Some("text/plain")
        );
    }

    #[test]
    fn test_invalid_utf8_is_decoded_lossily() {
        let extracted = BuiltinExtractor
            .extract(&[0x68, 0x69, 0xFF], "a.txt")
            .unwrap();
        assert!(extracted.text.starts_with("hi"));
    }

    #[test]
    fn test_garbage_pdf_fails_extraction() {
        let err = BuiltinExtractor
            .extract(b"not a pdf at all", "docs/report.pdf")
            .unwrap_err();
        assert!(matches!(err, SyncError::Extract(_)));
    }

    #[test]
    fn test_content_type_detection() {
        assert_eq!(detect_content_type("a/b/c.pdf"), "application/pdf");
        assert_eq!(detect_content_type("README.md"), "text/markdown");
        assert_eq!(detect_content_type("no-extension"), "text/plain");
    }
}
