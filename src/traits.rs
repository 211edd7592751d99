//! Capability traits consumed by the scan engine.
//!
//! The engine is deliberately stateless: everything it needs from the
//! outside world — the object store, the search index, and content
//! extraction — is passed in behind these traits. The bundled
//! [`S3Connector`](crate::connector_s3::S3Connector) implements
//! [`ObjectStore`]; the host process that owns the real index supplies the
//! [`SearchIndex`] implementation and wires a
//! [`Scanner`](crate::scanner::Scanner) per feed.
//!
//! ```text
//! ┌────────────┐      ┌───────────────────────────┐      ┌─────────────┐
//! │ ObjectStore│─────▶│  Scanner (one per feed)    │─────▶│ SearchIndex │
//! │  list/get  │      │ list→filter→write→reconcile│      │ bulk/status │
//! └────────────┘      └───────────┬───────────────┘      └─────────────┘
//!                                 ▼
//!                         ContentExtractor
//! ```

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;

use crate::errors::SyncError;
use crate::models::{BatchOperation, Listing};

/// A remote object store scoped to one bucket + prefix.
///
/// Implementations are constructed by a fallible connect step that probes
/// the bucket and fails with [`SyncError::Connection`] on bad credentials
/// or a missing bucket, so a misconfigured feed never starts scanning.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List every object under the prefix, following pagination to the end.
    ///
    /// The returned [`Listing::captured_at`] must be read from the local
    /// clock before the first page request is issued. Any page failure
    /// aborts the whole listing with [`SyncError::Listing`].
    async fn list(&self) -> Result<Listing, SyncError>;

    /// Download one object's raw bytes.
    async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, SyncError>;

    /// Resolve the public download URL for a key. Infallible; access to the
    /// URL itself remains subject to the store's credentials.
    fn resolve_url(&self, key: &str) -> String;

    /// User-defined metadata attached to the object, if any.
    async fn user_metadata(&self, key: &str) -> Result<BTreeMap<String, String>, SyncError>;
}

/// Per-operation outcome of a bulk submission.
#[derive(Debug, Clone, Default)]
pub struct BulkReport {
    /// Ids of operations the index rejected, with the index's message.
    pub failures: Vec<(String, String)>,
}

impl BulkReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Externally stored enable/disable state for a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    Started,
    Stopped,
    /// No status document exists yet (first observation of the feed).
    Unknown,
}

/// The search index collaborator.
///
/// Also owns the small key-value state the engine shares with external
/// control surfaces: the per-feed watermark and enable/disable status.
/// Both are last-writer-wins documents; the engine reads them once per
/// cycle, so an external stop takes effect at the next cycle boundary.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Submit a batch of write/delete operations, returning per-operation
    /// failures. A transport-level error means the whole batch's fate is
    /// unknown; callers treat it as a flush failure and move on.
    async fn bulk_submit(&self, ops: Vec<BatchOperation>) -> Result<BulkReport, SyncError>;

    /// Snapshot of document ids currently resident in the feed's index,
    /// capped at `limit`.
    ///
    /// The cap makes this an approximation: on collections larger than
    /// `limit`, deletions of documents beyond the cap may be missed until
    /// the collection shrinks. See `Scanner::INDEXED_IDS_LIMIT`.
    async fn document_ids(&self, limit: usize) -> Result<HashSet<String>, SyncError>;

    /// Read the feed's enable/disable flag.
    async fn feed_status(&self, feed: &str) -> Result<FeedStatus, SyncError>;

    /// Write the feed's enable/disable flag.
    async fn set_feed_status(&self, feed: &str, status: FeedStatus) -> Result<(), SyncError>;

    /// Read the persisted watermark (ms since epoch), if one exists.
    async fn watermark(&self, feed: &str) -> Result<Option<i64>, SyncError>;

    /// Persist the watermark for the feed.
    async fn set_watermark(&self, feed: &str, timestamp: i64) -> Result<(), SyncError>;
}

/// Output of content extraction: plain text plus whatever metadata the
/// extractor could pull out of the bytes.
#[derive(Debug, Clone, Default)]
pub struct Extracted {
    pub text: String,
    pub metadata: BTreeMap<String, String>,
}

/// Turns raw object bytes into indexable text.
///
/// Failures are isolated per object: the writer converts them into a skip
/// for that object and the cycle continues.
pub trait ContentExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8], key: &str) -> Result<Extracted, SyncError>;
}
