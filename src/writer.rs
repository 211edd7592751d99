//! Per-object document construction.
//!
//! Turns one changed [`ObjectSummary`] into at most one index write:
//! download the bytes, extract text (or pass the bytes through raw), and
//! assemble the document fields. Every step is fallible and every failure
//! degrades to a [`SkippedObject`] — one bad object never aborts the rest
//! of the cycle.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::models::{Document, ObjectSummary, SkipReason, SkippedObject};
use crate::traits::{ContentExtractor, Extracted, ObjectStore};

/// How document bodies are produced for a feed. Resolved once from the
/// feed's `raw` flag, not per object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Run content extraction over the object bytes.
    Extract,
    /// Submit the bytes unmodified as the document body.
    Raw,
}

impl WriteMode {
    pub fn from_raw_flag(raw: bool) -> Self {
        if raw {
            WriteMode::Raw
        } else {
            WriteMode::Extract
        }
    }
}

/// Build the index document for one object, or report why it was skipped.
pub async fn build_document(
    store: &dyn ObjectStore,
    extractor: &dyn ContentExtractor,
    mode: WriteMode,
    download_host: Option<&str>,
    summary: &ObjectSummary,
) -> Result<Document, SkippedObject> {
    let key = &summary.key;
    debug!(key = %key, "building document");

    let skip = |reason| SkippedObject {
        key: key.clone(),
        reason,
    };

    let bytes = match store.get_bytes(key).await {
        Ok(b) => b,
        Err(e) => {
            warn!(key = %key, error = %e, "skipping object: fetch failed");
            return Err(skip(SkipReason::FetchFailed));
        }
    };

    let extracted = match mode {
        WriteMode::Raw => Extracted {
            text: String::from_utf8_lossy(&bytes).to_string(),
            metadata: BTreeMap::new(),
        },
        WriteMode::Extract => match extractor.extract(&bytes, key) {
            Ok(e) => e,
            Err(e) => {
                warn!(key = %key, error = %e, "skipping object: extraction failed");
                return Err(skip(SkipReason::ExtractFailed));
            }
        },
    };

    // User metadata is best-effort; an unreadable HEAD never costs us the
    // document itself.
    let mut metadata = extracted.metadata;
    match store.user_metadata(key).await {
        Ok(user) => metadata.extend(user),
        Err(e) => debug!(key = %key, error = %e, "no user metadata"),
    }

    let source_url = match download_host {
        Some(host) => rewrite_download_url(&store.resolve_url(key), host),
        None => store.resolve_url(key),
    };

    Ok(Document {
        id: derive_document_id(key),
        title: title_from_key(key),
        modified_at: summary.last_modified,
        source_url,
        body: extracted.text,
        metadata,
    })
}

/// Derive the deterministic document id for an object key.
///
/// Path separators are normalized to `-`, so re-indexing an unchanged key
/// always overwrites the same document and never duplicates.
pub fn derive_document_id(key: &str) -> String {
    key.replace('/', "-")
}

/// The last path segment of a key.
fn title_from_key(key: &str) -> String {
    key.rsplit('/').next().unwrap_or(key).to_string()
}

/// Substitute a configured public host (a CDN vhost, typically) for the
/// store's generic endpoint host in a resolved URL. The object path is
/// preserved as-is.
pub fn rewrite_download_url(url: &str, download_host: &str) -> String {
    let path = url
        .find("://")
        .and_then(|scheme_end| url[scheme_end + 3..].find('/').map(|p| scheme_end + 3 + p))
        .map(|host_end| &url[host_end..])
        .unwrap_or("");
    format!("{}{}", download_host.trim_end_matches('/'), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_document_id_normalizes_separators() {
        assert_eq!(derive_document_id("dir/a.pdf"), "dir-a.pdf");
        assert_eq!(derive_document_id("a/b/c.txt"), "a-b-c.txt");
        assert_eq!(derive_document_id("flat.md"), "flat.md");
    }

    #[test]
    fn test_derive_document_id_is_idempotent_per_key() {
        assert_eq!(
            derive_document_id("x/y/z.pdf"),
            derive_document_id("x/y/z.pdf")
        );
    }

    #[test]
    fn test_title_is_last_path_segment() {
        assert_eq!(title_from_key("engineering/runbooks/deploy.pdf"), "deploy.pdf");
        assert_eq!(title_from_key("single.txt"), "single.txt");
    }

    #[test]
    fn test_rewrite_download_url_substitutes_host() {
        let url = "https://acme-docs.s3.us-east-1.amazonaws.com/dir/a.pdf";
        assert_eq!(
            rewrite_download_url(url, "https://cdn.example.com"),
            "https://cdn.example.com/dir/a.pdf"
        );
    }

    #[test]
    fn test_rewrite_download_url_trailing_slash_host() {
        let url = "https://bucket.s3.us-east-1.amazonaws.com/a.pdf";
        assert_eq!(
            rewrite_download_url(url, "https://cdn.example.com/"),
            "https://cdn.example.com/a.pdf"
        );
    }

    #[test]
    fn test_write_mode_from_flag() {
        assert_eq!(WriteMode::from_raw_flag(true), WriteMode::Raw);
        assert_eq!(WriteMode::from_raw_flag(false), WriteMode::Extract);
    }
}
