//! Change detection against a bucket listing.
//!
//! The store has no change feed, so each cycle compares a full listing
//! against the watermark persisted by the previous cycle. Deletion
//! detection needs the complete current key set, not just the delta, which
//! is why a partition returns both.

use std::collections::HashSet;

use crate::models::{Listing, ObjectSummary};

/// The two views one cycle needs of a listing: the objects to (re)index and
/// the full existence set.
#[derive(Debug)]
pub struct ChangeSet {
    /// Summaries modified strictly after the watermark, in listing order.
    pub changed: Vec<ObjectSummary>,
    /// Every key currently present under the prefix.
    pub all_keys: HashSet<String>,
}

/// Partition a listing against the last-cycle watermark.
///
/// A `None` watermark means nothing has been indexed yet and every object
/// is considered changed.
pub fn partition(listing: Listing, watermark: Option<i64>) -> ChangeSet {
    let watermark = watermark.unwrap_or(0);
    let all_keys = listing.all_keys();
    let changed = listing
        .summaries
        .into_iter()
        .filter(|s| s.last_modified > watermark)
        .collect();

    ChangeSet { changed, all_keys }
}
