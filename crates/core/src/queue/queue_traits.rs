use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::queue_model::{FailOutcome, NewPushQueueItem, PushQueueItem};
use crate::errors::Result;

/// Durable push queue storage.
///
/// `claim_batch` must be atomic across workers: a row handed to one worker
/// is invisible to others until its lease expires or it is released.
#[async_trait]
pub trait PushQueueRepositoryTrait: Send + Sync {
    /// Add an item, replacing the pending op of an existing
    /// `(mapping_id, entity_type, local_id)` row.
    async fn enqueue(&self, item: NewPushQueueItem) -> Result<PushQueueItem>;

    /// Claim up to `limit` due, unclaimed items for `worker_id`.
    async fn claim_batch(
        &self,
        worker_id: &str,
        limit: usize,
        lease_secs: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<PushQueueItem>>;

    /// Remove a processed item. If it was re-enqueued while claimed, the
    /// claim is dropped instead so the newer event is processed.
    async fn complete(&self, item: &PushQueueItem) -> Result<()>;

    /// Increment `fail_count`; dead-letter (remove) past `retry_ceiling`,
    /// otherwise unclaim and delay until `next_attempt_at`.
    async fn mark_failed(
        &self,
        item: &PushQueueItem,
        error: &str,
        retry_ceiling: u32,
        next_attempt_at: DateTime<Utc>,
    ) -> Result<FailOutcome>;

    /// Drop claims without recording a failure.
    async fn release(&self, item_ids: &[String]) -> Result<usize>;

    fn list_items(&self, limit: i64) -> Result<Vec<PushQueueItem>>;
}
