//! Batched write-back to the search index.
//!
//! Operations accumulate until the feed's flush threshold is reached, then
//! go to the index as one bulk request; whatever remains at cycle end is
//! flushed below threshold. The write path is at-least-once: a failed
//! flush (partial or total) is logged with the operation ids involved and
//! the cycle carries on — no rollback, no same-cycle retry.

use tracing::{debug, warn};

use crate::models::BatchOperation;
use crate::traits::SearchIndex;

/// Accumulates index operations for one scan cycle.
pub struct BatchAccumulator<'a> {
    index: &'a dyn SearchIndex,
    threshold: usize,
    pending: Vec<BatchOperation>,
    /// Flushes performed so far.
    pub flushes: u32,
    /// Operations the index reported failed, plus operations lost to
    /// transport-level flush errors.
    pub failed_ops: u64,
}

impl<'a> BatchAccumulator<'a> {
    pub fn new(index: &'a dyn SearchIndex, threshold: usize) -> Self {
        Self {
            index,
            threshold: threshold.max(1),
            pending: Vec::new(),
            flushes: 0,
            failed_ops: 0,
        }
    }

    /// Enqueue one operation, flushing if the threshold is reached.
    pub async fn add(&mut self, op: BatchOperation) {
        self.pending.push(op);
        if self.pending.len() >= self.threshold {
            self.flush().await;
        }
    }

    /// Flush whatever remains at cycle end, below threshold or not.
    pub async fn finish(&mut self) {
        if !self.pending.is_empty() {
            self.flush().await;
        }
    }

    async fn flush(&mut self) {
        let ops = std::mem::take(&mut self.pending);
        let count = ops.len();
        let ids: Vec<String> = ops.iter().map(|op| op.id().to_string()).collect();
        debug!(count, "flushing batch");
        self.flushes += 1;

        match self.index.bulk_submit(ops).await {
            Ok(report) => {
                if report.has_failures() {
                    self.failed_ops += report.failures.len() as u64;
                    for (id, message) in &report.failures {
                        warn!(id = %id, message = %message, "bulk operation failed");
                    }
                }
            }
            Err(e) => {
                // The whole batch's fate is unknown; count it all failed
                // and keep the cycle alive.
                self.failed_ops += count as u64;
                warn!(error = %e, ops = ?ids, "batch flush failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SyncError;
    use crate::models::Document;
    use crate::traits::{BulkReport, FeedStatus};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Records the size of each submitted batch; optionally fails ops.
    #[derive(Default)]
    struct RecordingIndex {
        batches: Mutex<Vec<usize>>,
        fail_ids: Vec<String>,
        transport_error: bool,
    }

    #[async_trait]
    impl SearchIndex for RecordingIndex {
        async fn bulk_submit(
            &self,
            ops: Vec<BatchOperation>,
        ) -> Result<BulkReport, SyncError> {
            self.batches.lock().unwrap().push(ops.len());
            if self.transport_error {
                return Err(SyncError::Flush("connection reset".to_string()));
            }
            let failures = ops
                .iter()
                .filter(|op| self.fail_ids.contains(&op.id().to_string()))
                .map(|op| (op.id().to_string(), "mapping conflict".to_string()))
                .collect();
            Ok(BulkReport { failures })
        }

        async fn document_ids(&self, _limit: usize) -> Result<HashSet<String>, SyncError> {
            Ok(HashSet::new())
        }

        async fn feed_status(&self, _feed: &str) -> Result<FeedStatus, SyncError> {
            Ok(FeedStatus::Started)
        }

        async fn set_feed_status(
            &self,
            _feed: &str,
            _status: FeedStatus,
        ) -> Result<(), SyncError> {
            Ok(())
        }

        async fn watermark(&self, _feed: &str) -> Result<Option<i64>, SyncError> {
            Ok(None)
        }

        async fn set_watermark(&self, _feed: &str, _timestamp: i64) -> Result<(), SyncError> {
            Ok(())
        }
    }

    fn delete_op(n: usize) -> BatchOperation {
        BatchOperation::Delete(format!("doc-{}", n))
    }

    #[tokio::test]
    async fn test_threshold_triggers_flush_then_remainder() {
        let index = RecordingIndex::default();
        let mut batch = BatchAccumulator::new(&index, 100);

        for n in 0..150 {
            batch.add(delete_op(n)).await;
        }
        batch.finish().await;

        assert_eq!(*index.batches.lock().unwrap(), vec![100, 50]);
        assert_eq!(batch.flushes, 2);
        assert_eq!(batch.failed_ops, 0);
    }

    #[tokio::test]
    async fn test_finish_with_empty_queue_does_nothing() {
        let index = RecordingIndex::default();
        let mut batch = BatchAccumulator::new(&index, 100);
        batch.finish().await;
        assert!(index.batches.lock().unwrap().is_empty());
        assert_eq!(batch.flushes, 0);
    }

    #[tokio::test]
    async fn test_partial_failures_counted_not_fatal() {
        let index = RecordingIndex {
            fail_ids: vec!["doc-3".to_string()],
            ..Default::default()
        };
        let mut batch = BatchAccumulator::new(&index, 10);
        for n in 0..10 {
            batch.add(delete_op(n)).await;
        }
        batch.finish().await;
        assert_eq!(batch.failed_ops, 1);
        assert_eq!(batch.flushes, 1);
    }

    #[tokio::test]
    async fn test_transport_error_counts_whole_batch() {
        let index = RecordingIndex {
            transport_error: true,
            ..Default::default()
        };
        let mut batch = BatchAccumulator::new(&index, 5);
        for n in 0..7 {
            batch.add(delete_op(n)).await;
        }
        batch.finish().await;
        // 5 at threshold, 2 at finish; all lost but nothing panicked.
        assert_eq!(batch.failed_ops, 7);
        assert_eq!(batch.flushes, 2);
    }

    #[tokio::test]
    async fn test_write_ops_flow_through() {
        let index = RecordingIndex::default();
        let mut batch = BatchAccumulator::new(&index, 100);
        batch
            .add(BatchOperation::Write(Document {
                id: "dir-a.pdf".to_string(),
                title: "a.pdf".to_string(),
                modified_at: 100,
                source_url: "https://x/a.pdf".to_string(),
                body: "text".to_string(),
                metadata: Default::default(),
            }))
            .await;
        batch.finish().await;
        assert_eq!(*index.batches.lock().unwrap(), vec![1]);
    }
}
