//! Include/exclude filtering of object keys.
//!
//! Patterns are shell-style globs (`*`, `?`) matched against the full
//! object key, anchored at both ends. Precedence, in order:
//!
//! 1. both lists empty — every key is indexable;
//! 2. any exclude match rejects, regardless of includes;
//! 3. an empty include list accepts;
//! 4. otherwise the key must match some include pattern.

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};

/// Compiled include/exclude matcher for one feed. Pure and stateless after
/// construction; build it once per feed, not per object.
#[derive(Debug)]
pub struct KeyFilter {
    includes: GlobSet,
    excludes: GlobSet,
    has_includes: bool,
    has_excludes: bool,
}

impl KeyFilter {
    /// Compile the feed's pattern lists. Fails on malformed globs so a bad
    /// pattern is caught at startup rather than silently matching nothing.
    pub fn new(includes: &[String], excludes: &[String]) -> Result<Self> {
        Ok(Self {
            includes: build_globset(includes)?,
            excludes: build_globset(excludes)?,
            has_includes: !includes.is_empty(),
            has_excludes: !excludes.is_empty(),
        })
    }

    /// Decide whether a key is eligible for indexing.
    pub fn is_indexable(&self, key: &str) -> bool {
        if self.has_excludes && self.excludes.is_match(key) {
            return false;
        }
        if !self.has_includes {
            return true;
        }
        self.includes.is_match(key)
    }
}

/// Build a [`GlobSet`] from a list of glob pattern strings.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
