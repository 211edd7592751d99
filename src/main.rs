//! # Bucket Sync CLI (`bsync`)
//!
//! Operational commands around the sync engine. The scan loop itself runs
//! inside the host process that owns the search index (see the library
//! docs); `bsync` covers the parts that only need the object store:
//!
//! | Command | Description |
//! |---------|-------------|
//! | `bsync check` | Validate the config and probe every feed's bucket |
//! | `bsync ls <feed>` | List the keys one cycle would consider indexable |
//!
//! ```bash
//! bsync --config ./config/bsync.toml check
//! bsync --config ./config/bsync.toml ls docs
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bucket_sync::config;
use bucket_sync::connector_s3::S3Connector;
use bucket_sync::filter::KeyFilter;
use bucket_sync::traits::ObjectStore;

/// Bucket Sync — incremental synchronization of object-store buckets into
/// a search index.
#[derive(Parser)]
#[command(
    name = "bsync",
    about = "Incremental synchronization of object-store buckets into a search index",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/bsync.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration and probe every feed's bucket.
    Check,
    /// Run one listing over a feed and print the indexable keys.
    Ls {
        /// Feed name from the configuration file.
        feed: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Check => check(&config).await,
        Commands::Ls { feed } => ls(&config, &feed).await,
    }
}

async fn check(config: &config::Config) -> Result<()> {
    if config.feeds.is_empty() {
        bail!("no feeds configured");
    }

    for (name, feed) in &config.feeds {
        KeyFilter::new(&feed.includes, &feed.excludes)
            .with_context(|| format!("invalid patterns for feed '{}'", name))?;
        S3Connector::connect(feed)
            .await
            .with_context(|| format!("connection check failed for feed '{}'", name))?;
        println!("{:<16} s3://{}/{} OK", name, feed.bucket, feed.prefix);
    }
    println!("ok");
    Ok(())
}

async fn ls(config: &config::Config, feed_name: &str) -> Result<()> {
    let feed = config
        .feeds
        .get(feed_name)
        .with_context(|| format!("unknown feed: '{}'", feed_name))?;

    let filter = KeyFilter::new(&feed.includes, &feed.excludes)?;
    let store = S3Connector::connect(feed).await?;
    let listing = store.list().await?;

    let mut indexable = 0usize;
    for summary in &listing.summaries {
        if filter.is_indexable(&summary.key) {
            println!("{:>12}  {}", summary.size, summary.key);
            indexable += 1;
        }
    }
    println!(
        "{} objects, {} indexable, captured at {}",
        listing.summaries.len(),
        indexable,
        listing.captured_at
    );
    Ok(())
}
