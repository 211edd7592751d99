//! Core data models used throughout Bucket Sync.
//!
//! These types represent the object summaries, listings, documents, and
//! batch operations that flow through one synchronization cycle.

use std::collections::{BTreeMap, HashSet};

/// Snapshot of one object taken from a single bucket listing.
///
/// Identity is the `key`; keys are unique within one listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    /// Full object key (path within the bucket).
    pub key: String,
    /// Last modification time, milliseconds since epoch.
    pub last_modified: i64,
    /// Object size in bytes.
    pub size: i64,
    /// Entity tag reported by the store, stripped of surrounding quotes.
    pub etag: String,
}

/// The result of one full (paginated) listing pass over a bucket prefix.
///
/// `captured_at` is read from the local clock *before* the first page
/// request so that objects modified during a slow listing are still newer
/// than the watermark persisted for this cycle.
#[derive(Debug, Clone)]
pub struct Listing {
    /// Local clock time (ms since epoch) taken before the query ran.
    pub captured_at: i64,
    /// Every object summary under the prefix, in listing order.
    pub summaries: Vec<ObjectSummary>,
}

impl Listing {
    /// The complete current existence set, used for deletion detection.
    pub fn all_keys(&self) -> HashSet<String> {
        self.summaries.iter().map(|s| s.key.clone()).collect()
    }
}

/// A document ready to be written to the search index.
///
/// Built all-or-nothing per object: a failure anywhere in fetch/extract
/// yields a skip for that object, never a partial document.
#[derive(Debug, Clone)]
pub struct Document {
    /// Deterministic id derived from the object key (`/` → `-`).
    pub id: String,
    /// Last path segment of the object key.
    pub title: String,
    /// Source object modification time, ms since epoch.
    pub modified_at: i64,
    /// Resolved download URL (possibly vhost-rewritten).
    pub source_url: String,
    /// Extracted (or raw passthrough) text body.
    pub body: String,
    /// Extracted metadata merged with the store's user metadata.
    pub metadata: BTreeMap<String, String>,
}

/// One pending index mutation, accumulated and flushed in batches.
#[derive(Debug, Clone)]
pub enum BatchOperation {
    Write(Document),
    Delete(String),
}

impl BatchOperation {
    /// The document id this operation targets.
    pub fn id(&self) -> &str {
        match self {
            BatchOperation::Write(doc) => &doc.id,
            BatchOperation::Delete(id) => id,
        }
    }
}

/// Why an object was skipped during a cycle instead of indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Downloading the object's bytes failed.
    FetchFailed,
    /// Content extraction failed.
    ExtractFailed,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::FetchFailed => write!(f, "fetch failed"),
            SkipReason::ExtractFailed => write!(f, "extraction failed"),
        }
    }
}

/// An object that was passed over this cycle, with the reason.
#[derive(Debug, Clone)]
pub struct SkippedObject {
    pub key: String,
    pub reason: SkipReason,
}

/// Summary of one completed scan cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Objects whose modification time was newer than the watermark.
    pub changed: usize,
    /// Write operations enqueued.
    pub written: u64,
    /// Delete operations enqueued.
    pub deleted: u64,
    /// Objects skipped with their reasons.
    pub skipped: Vec<SkippedObject>,
    /// Batch flushes performed (threshold-triggered plus the final one).
    pub flushes: u32,
    /// Operations reported failed by the index across all flushes.
    pub failed_ops: u64,
    /// The watermark persisted for this cycle (listing capture time).
    pub watermark: i64,
}
