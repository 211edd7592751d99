//! The per-feed scan loop.
//!
//! One [`Scanner`] owns one feed and runs its cycles strictly one at a
//! time: gate on the externally stored status flag, list the bucket,
//! partition against the watermark, write changed objects, reconcile
//! deletions, flush, persist the new watermark, sleep, repeat. Cycle-level
//! failures (listing, credentials) are logged and retried next interval;
//! only an explicit stop halts the loop.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::batch::BatchAccumulator;
use crate::changes::partition;
use crate::config::FeedConfig;
use crate::errors::SyncError;
use crate::filter::KeyFilter;
use crate::models::{BatchOperation, CycleReport};
use crate::reconcile::reconcile_deletions;
use crate::traits::{ContentExtractor, FeedStatus, ObjectStore, SearchIndex};
use crate::writer::{build_document, WriteMode};

pub struct Scanner {
    feed: String,
    config: FeedConfig,
    filter: KeyFilter,
    mode: WriteMode,
    store: Arc<dyn ObjectStore>,
    index: Arc<dyn SearchIndex>,
    extractor: Arc<dyn ContentExtractor>,
}

impl Scanner {
    /// How many indexed ids are snapshotted per cycle for deletion
    /// detection. Collections larger than this may see deletions deferred
    /// until the collection shrinks below the cap; see
    /// [`SearchIndex::document_ids`].
    pub const INDEXED_IDS_LIMIT: usize = 5000;

    pub fn new(
        feed: String,
        config: FeedConfig,
        store: Arc<dyn ObjectStore>,
        index: Arc<dyn SearchIndex>,
        extractor: Arc<dyn ContentExtractor>,
    ) -> anyhow::Result<Self> {
        let filter = KeyFilter::new(&config.includes, &config.excludes)?;
        let mode = WriteMode::from_raw_flag(config.raw);
        Ok(Self {
            feed,
            config,
            filter,
            mode,
            store,
            index,
            extractor,
        })
    }

    /// Run cycles until `shutdown` is cancelled.
    ///
    /// Cancellation is cooperative: it is checked at each cycle boundary
    /// and honored immediately during the sleep, so an in-flight cycle
    /// finishes but no new one starts.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(feed = %self.feed, bucket = %self.config.bucket, "starting feed scanning");

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            if self.is_enabled().await {
                match self.run_cycle().await {
                    Ok(report) => {
                        info!(
                            feed = %self.feed,
                            changed = report.changed,
                            written = report.written,
                            deleted = report.deleted,
                            skipped = report.skipped.len(),
                            failed_ops = report.failed_ops,
                            watermark = report.watermark,
                            "cycle complete"
                        );
                    }
                    Err(e) => {
                        warn!(feed = %self.feed, error = %e, "cycle failed, retrying next interval");
                    }
                }
            } else {
                info!(feed = %self.feed, "feed is disabled, skipping cycle");
            }

            let interval = Duration::from_millis(self.config.update_interval_ms);
            debug!(feed = %self.feed, ?interval, "sleeping until next cycle");
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        info!(feed = %self.feed, "feed scanning stopped");
    }

    /// Consult the externally stored enable/disable flag.
    ///
    /// On first observation (no status document yet) the feed is recorded
    /// as started and the cycle proceeds. A read failure also proceeds:
    /// the flag is advisory and a transient index error must not wedge the
    /// loop.
    async fn is_enabled(&self) -> bool {
        match self.index.feed_status(&self.feed).await {
            Ok(FeedStatus::Started) => true,
            Ok(FeedStatus::Stopped) => false,
            Ok(FeedStatus::Unknown) => {
                if let Err(e) = self
                    .index
                    .set_feed_status(&self.feed, FeedStatus::Started)
                    .await
                {
                    warn!(feed = %self.feed, error = %e, "failed to record feed status");
                }
                true
            }
            Err(e) => {
                warn!(feed = %self.feed, error = %e, "failed to get feed status, proceeding");
                true
            }
        }
    }

    /// Run one full cycle: list → partition → write → reconcile → flush →
    /// persist watermark.
    ///
    /// Per-object failures are collected as skips. A listing failure
    /// aborts before anything is written and leaves the watermark
    /// untouched, so the next interval retries the same range.
    pub async fn run_cycle(&self) -> Result<CycleReport, SyncError> {
        let watermark = match self.index.watermark(&self.feed).await {
            Ok(w) => w,
            Err(e) => {
                // Fall back to a full rescan; idempotent ids make the
                // re-writes harmless.
                warn!(feed = %self.feed, error = %e, "failed to read watermark, rescanning all");
                None
            }
        };
        debug!(feed = %self.feed, ?watermark, "scanning bucket for changes");

        let listing = self.store.list().await?;
        let captured_at = listing.captured_at;
        let change_set = partition(listing, watermark);

        let indexed_ids = self.index.document_ids(Self::INDEXED_IDS_LIMIT).await?;

        let mut report = CycleReport {
            changed: change_set.changed.len(),
            watermark: captured_at,
            ..Default::default()
        };
        let mut batch = BatchAccumulator::new(&*self.index, self.config.bulk_size);

        for summary in &change_set.changed {
            if !self.filter.is_indexable(&summary.key) {
                debug!(key = %summary.key, "not indexable, ignoring");
                continue;
            }
            match build_document(
                &*self.store,
                &*self.extractor,
                self.mode,
                self.config.download_host.as_deref(),
                summary,
            )
            .await
            {
                Ok(doc) => {
                    batch.add(BatchOperation::Write(doc)).await;
                    report.written += 1;
                }
                Err(skipped) => report.skipped.push(skipped),
            }
        }

        for id in reconcile_deletions(&change_set.all_keys, &indexed_ids) {
            debug!(%id, "scheduling deletion");
            batch.add(BatchOperation::Delete(id)).await;
            report.deleted += 1;
        }

        batch.finish().await;
        report.flushes = batch.flushes;
        report.failed_ops = batch.failed_ops;

        // Persisted once per completed cycle, even when individual objects
        // failed; only a listing failure (which returns early above) keeps
        // the old watermark.
        self.index.set_watermark(&self.feed, captured_at).await?;

        Ok(report)
    }
}
