//! Deletion detection by set difference.
//!
//! The store only reports what exists, so deletions are inferred: any id
//! the index holds that no current key maps to belongs to an object that
//! was removed from the bucket.

use std::collections::HashSet;

use crate::writer::derive_document_id;

/// Compute the document ids to delete: previously indexed ids whose source
/// object no longer appears in the current listing.
///
/// A key present in `all_current_keys` can never be returned, so a listed
/// object is never deleted in the same cycle that observed it.
pub fn reconcile_deletions(
    all_current_keys: &HashSet<String>,
    indexed_ids: &HashSet<String>,
) -> Vec<String> {
    let current_ids: HashSet<String> = all_current_keys
        .iter()
        .map(|k| derive_document_id(k))
        .collect();

    indexed_ids
        .iter()
        .filter(|id| !current_ids.contains(*id))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_missing_object_scheduled_for_deletion() {
        let current = keys(&["a", "b"]);
        let indexed = keys(&["a", "b", "c"]);
        let deletions = reconcile_deletions(&current, &indexed);
        assert_eq!(deletions, vec!["c".to_string()]);
    }

    #[test]
    fn test_no_deletions_when_index_matches_listing() {
        let current = keys(&["dir/a.pdf", "dir/b.pdf"]);
        let indexed = keys(&["dir-a.pdf", "dir-b.pdf"]);
        assert!(reconcile_deletions(&current, &indexed).is_empty());
    }

    #[test]
    fn test_nested_keys_compared_via_derived_ids() {
        let current = keys(&["dir/a.pdf"]);
        let indexed = keys(&["dir-a.pdf", "dir-gone.pdf"]);
        let deletions = reconcile_deletions(&current, &indexed);
        assert_eq!(deletions, vec!["dir-gone.pdf".to_string()]);
    }

    #[test]
    fn test_empty_listing_deletes_everything_indexed() {
        let current = HashSet::new();
        let indexed = keys(&["x", "y"]);
        let mut deletions = reconcile_deletions(&current, &indexed);
        deletions.sort();
        assert_eq!(deletions, vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_empty_index_deletes_nothing() {
        let current = keys(&["a"]);
        assert!(reconcile_deletions(&current, &HashSet::new()).is_empty());
    }
}
