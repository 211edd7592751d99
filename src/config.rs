use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Top-level configuration: one [`FeedConfig`] per synchronized feed.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub feeds: BTreeMap<String, FeedConfig>,
}

/// One configured source: a bucket + prefix synchronized into one
/// index/type pair.
#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    /// Bucket to scan.
    pub bucket: String,
    /// Key prefix under the bucket; empty scans the whole bucket.
    #[serde(default)]
    pub prefix: String,
    /// AWS region for request signing.
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint for S3-compatible stores (MinIO, LocalStack).
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// Public host substituted into resolved download URLs (e.g. a
    /// CloudFront vhost). When unset, the store's own URL is used.
    #[serde(default)]
    pub download_host: Option<String>,
    /// Milliseconds to sleep between scan cycles.
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,
    /// Glob patterns (`*`, `?`) a key must match to be indexed.
    /// Empty means match all.
    #[serde(default)]
    pub includes: Vec<String>,
    /// Glob patterns that reject a key even when an include matches.
    #[serde(default)]
    pub excludes: Vec<String>,
    /// Pending-operation count that triggers a batch flush.
    #[serde(default = "default_bulk_size")]
    pub bulk_size: usize,
    /// Submit object bytes unmodified as the document body instead of
    /// running content extraction.
    #[serde(default)]
    pub raw: bool,
    /// Index name documents are written to. Defaults to the feed name.
    #[serde(default)]
    pub index: Option<String>,
    /// Document type within the index.
    #[serde(default = "default_doc_type")]
    pub doc_type: String,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_update_interval_ms() -> u64 {
    15 * 60 * 1000
}

fn default_bulk_size() -> usize {
    100
}

fn default_doc_type() -> String {
    "doc".to_string()
}

impl FeedConfig {
    /// The index this feed writes to: the explicit `index` option or the
    /// feed's own name.
    pub fn index_name<'a>(&'a self, feed: &'a str) -> &'a str {
        self.index.as_deref().unwrap_or(feed)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    for (name, feed) in &config.feeds {
        if feed.bucket.is_empty() {
            anyhow::bail!("feeds.{}.bucket must not be empty", name);
        }
        if feed.bulk_size == 0 {
            anyhow::bail!("feeds.{}.bulk_size must be > 0", name);
        }
        if feed.update_interval_ms == 0 {
            anyhow::bail!("feeds.{}.update_interval_ms must be > 0", name);
        }
    }

    Ok(config)
}
