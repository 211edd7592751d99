//! Engine error taxonomy.
//!
//! The severity ladder: `Connection` is fatal at startup (the feed must not
//! start on bad credentials or a missing bucket); `Listing` aborts the
//! current cycle without touching the watermark; `Fetch` and `Extract` are
//! per-object and degrade to skips; `Flush` is per-batch and logged without
//! rolling anything back. Nothing in steady state is fatal.

use thiserror::Error;

use crate::models::SkipReason;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Bad credentials or nonexistent bucket, detected by the startup probe.
    #[error("cannot connect to bucket '{bucket}': {reason}")]
    Connection { bucket: String, reason: String },

    /// A listing page failed; the cycle is abandoned and retried next interval.
    #[error("listing failed: {0}")]
    Listing(String),

    /// Downloading one object's bytes failed.
    #[error("fetch failed for '{key}': {reason}")]
    Fetch { key: String, reason: String },

    /// Content extraction failed for one object.
    #[error("extraction failed: {0}")]
    Extract(String),

    /// A batch submission failed in transit (distinct from per-op failures,
    /// which the index reports individually).
    #[error("batch flush failed: {0}")]
    Flush(String),

    /// A metadata read/write against the index failed (watermark, status,
    /// indexed-id snapshot).
    #[error("index operation failed: {0}")]
    Index(String),
}

impl SyncError {
    /// The per-object skip reason this error maps to, if it is one of the
    /// recoverable per-object failures.
    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            SyncError::Fetch { .. } => Some(SkipReason::FetchFailed),
            SyncError::Extract(_) => Some(SkipReason::ExtractFailed),
            _ => None,
        }
    }
}
