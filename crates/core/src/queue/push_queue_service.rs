use std::sync::Arc;

use chrono::{Duration, Utc};
use log::{debug, error, info, warn};

use super::queue_model::{FailOutcome, NewPushQueueItem, PushBatchSummary, PushQueueItem};
use super::queue_traits::PushQueueRepositoryTrait;
use crate::errors::{Error, Result};
use crate::events::{NoOpEventSink, SyncEvent, SyncEventSink};
use crate::settings::SyncSettings;
use crate::sync::{classify_error, jittered_backoff_seconds, SyncEngine, SyncRetryClass};

/// Drains the push queue through the sync engine.
pub struct PushQueue {
    repository: Arc<dyn PushQueueRepositoryTrait>,
    engine: Arc<SyncEngine>,
    settings: SyncSettings,
    events: Arc<dyn SyncEventSink>,
}

impl PushQueue {
    pub fn new(
        repository: Arc<dyn PushQueueRepositoryTrait>,
        engine: Arc<SyncEngine>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            repository,
            engine,
            settings,
            events: Arc::new(NoOpEventSink),
        }
    }

    pub fn with_event_sink(mut self, events: Arc<dyn SyncEventSink>) -> Self {
        self.events = events;
        self
    }

    pub async fn enqueue(&self, item: NewPushQueueItem) -> Result<PushQueueItem> {
        self.repository.enqueue(item).await
    }

    /// Claim up to `limit` due items for this worker.
    pub async fn claim_batch(&self, limit: usize) -> Result<Vec<PushQueueItem>> {
        self.repository
            .claim_batch(
                &self.settings.worker_id,
                limit,
                self.settings.push_claim_lease_secs,
                Utc::now(),
            )
            .await
    }

    pub async fn complete(&self, item: &PushQueueItem) -> Result<()> {
        self.repository.complete(item).await
    }

    /// Record a failed attempt. Past `retry_ceiling` the item is dead-lettered
    /// and an error event is reported.
    pub async fn fail(
        &self,
        item: &PushQueueItem,
        err: &Error,
        retry_ceiling: u32,
    ) -> Result<FailOutcome> {
        let next_attempt_at =
            Utc::now() + Duration::seconds(jittered_backoff_seconds(item.fail_count));
        let outcome = self
            .repository
            .mark_failed(item, &err.to_string(), retry_ceiling, next_attempt_at)
            .await?;

        match outcome {
            FailOutcome::DeadLettered { fail_count } => {
                error!(
                    "[SfQueue] Gave up on {} of {} {} after {} attempts: {}",
                    item.op, item.entity_type, item.local_id, fail_count, err
                );
                self.events.report(
                    SyncEvent::error(
                        "Queued {op} of {entity_type} {local_id} permanently failed after {attempts} attempts: {message}",
                    )
                    .with("op", item.op)
                    .with("entity_type", &item.entity_type)
                    .with("local_id", &item.local_id)
                    .with("attempts", fail_count)
                    .with("message", err),
                );
            }
            FailOutcome::Requeued {
                fail_count,
                next_attempt_at,
            } => {
                warn!(
                    "[SfQueue] {} of {} {} failed (attempt {}), retry at {}: {}",
                    item.op, item.entity_type, item.local_id, fail_count, next_attempt_at, err
                );
            }
        }
        Ok(outcome)
    }

    /// Claim one batch and process it sequentially.
    ///
    /// An auth failure releases the rest of the batch unpenalized and marks
    /// the summary suspended.
    pub async fn run_push_batch(&self) -> Result<PushBatchSummary> {
        let items = self.claim_batch(self.settings.push_batch_size).await?;
        let mut summary = PushBatchSummary {
            claimed: items.len(),
            ..PushBatchSummary::default()
        };
        if items.is_empty() {
            return Ok(summary);
        }
        debug!("[SfQueue] Claimed {} items", items.len());

        for (index, item) in items.iter().enumerate() {
            match self.engine.process_queue_item(item).await {
                Ok(()) => {
                    self.complete(item).await?;
                    summary.succeeded += 1;
                }
                Err(err) if classify_error(&err) == SyncRetryClass::ReauthRequired => {
                    let remaining: Vec<String> =
                        items[index..].iter().map(|i| i.id.clone()).collect();
                    let released = self.repository.release(&remaining).await?;
                    warn!(
                        "[SfQueue] Authentication failed, batch suspended ({} items released): {}",
                        released, err
                    );
                    self.events.report(
                        SyncEvent::error("Push queue suspended: {message}").with("message", &err),
                    );
                    summary.suspended = true;
                    break;
                }
                Err(err) => {
                    let ceiling = self.engine.retry_ceiling(&item.mapping_id)?;
                    match self.fail(item, &err, ceiling).await? {
                        FailOutcome::DeadLettered { .. } => summary.dead_lettered += 1,
                        FailOutcome::Requeued { .. } => summary.failed += 1,
                    }
                }
            }
        }

        info!(
            "[SfQueue] Batch done: {} claimed, {} succeeded, {} failed, {} dead-lettered{}",
            summary.claimed,
            summary.succeeded,
            summary.failed,
            summary.dead_lettered,
            if summary.suspended { ", suspended" } else { "" }
        );
        Ok(summary)
    }
}
