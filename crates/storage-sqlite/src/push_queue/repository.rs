//! Repository for the durable push queue.
//!
//! Claims are leases: `claimed_until` in the future hides a row from other
//! workers. Every claim runs in an immediate transaction on the writer, so two
//! workers never receive the same row.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use log::debug;
use uuid::Uuid;

use sfsync_core::queue::{
    exceeds_retry_ceiling, FailOutcome, NewPushQueueItem, PushQueueItem, PushQueueRepositoryTrait,
};
use sfsync_core::{Error, Result};

use super::model::PushQueueItemDB;
use crate::db::{get_connection, to_db_timestamp, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::sf_push_queue;

pub struct PushQueueRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl PushQueueRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

fn load_row(conn: &mut SqliteConnection, item_id: &str) -> Result<Option<PushQueueItemDB>> {
    Ok(sf_push_queue::table
        .find(item_id)
        .first::<PushQueueItemDB>(conn)
        .optional()
        .map_err(StorageError::from)?)
}

#[async_trait]
impl PushQueueRepositoryTrait for PushQueueRepository {
    async fn enqueue(&self, new_item: NewPushQueueItem) -> Result<PushQueueItem> {
        let row = self
            .writer
            .exec(move |conn| {
                let now = to_db_timestamp(&Utc::now());
                let existing = sf_push_queue::table
                    .filter(sf_push_queue::mapping_id.eq(&new_item.mapping_id))
                    .filter(sf_push_queue::entity_type.eq(&new_item.entity_type))
                    .filter(sf_push_queue::local_id.eq(&new_item.local_id))
                    .first::<PushQueueItemDB>(conn)
                    .optional()
                    .map_err(StorageError::from)?;

                let item_id = match existing {
                    Some(row) => {
                        diesel::update(sf_push_queue::table.find(&row.id))
                            .set((
                                sf_push_queue::op.eq(new_item.op.as_str()),
                                sf_push_queue::mapped_object_id
                                    .eq(new_item.mapped_object_id.clone().or(row.mapped_object_id)),
                                sf_push_queue::enqueued_at.eq(&now),
                                sf_push_queue::next_attempt_at.eq(&now),
                            ))
                            .execute(conn)
                            .map_err(StorageError::from)?;
                        debug!(
                            "[SfQueue] Replaced pending op for {}/{} with {}",
                            new_item.entity_type, new_item.local_id, new_item.op
                        );
                        row.id
                    }
                    None => {
                        let row = PushQueueItemDB {
                            id: Uuid::new_v4().to_string(),
                            mapping_id: new_item.mapping_id,
                            entity_type: new_item.entity_type,
                            local_id: new_item.local_id,
                            mapped_object_id: new_item.mapped_object_id,
                            op: new_item.op.as_str().to_string(),
                            enqueued_at: now.clone(),
                            fail_count: 0,
                            last_error: None,
                            next_attempt_at: now,
                            claimed_by: None,
                            claimed_until: None,
                        };
                        diesel::insert_into(sf_push_queue::table)
                            .values(&row)
                            .execute(conn)
                            .map_err(StorageError::from)?;
                        row.id
                    }
                };

                load_row(conn, &item_id)?
                    .ok_or_else(|| Error::Storage(format!("Queue item {} vanished", item_id)))
            })
            .await?;

        PushQueueItem::try_from(row)
    }

    async fn claim_batch(
        &self,
        worker_id: &str,
        limit: usize,
        lease_secs: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<PushQueueItem>> {
        let worker_id = worker_id.to_string();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows = self
            .writer
            .exec(move |conn| {
                let now_db = to_db_timestamp(&now);
                let lease_until = to_db_timestamp(&(now + Duration::seconds(lease_secs)));

                let ids = sf_push_queue::table
                    .filter(sf_push_queue::next_attempt_at.le(&now_db))
                    .filter(
                        sf_push_queue::claimed_until
                            .is_null()
                            .or(sf_push_queue::claimed_until.le(&now_db)),
                    )
                    .order((
                        sf_push_queue::next_attempt_at.asc(),
                        sf_push_queue::enqueued_at.asc(),
                    ))
                    .limit(limit)
                    .select(sf_push_queue::id)
                    .load::<String>(conn)
                    .map_err(StorageError::from)?;
                if ids.is_empty() {
                    return Ok(Vec::new());
                }

                diesel::update(sf_push_queue::table.filter(sf_push_queue::id.eq_any(&ids)))
                    .set((
                        sf_push_queue::claimed_by.eq(Some(worker_id)),
                        sf_push_queue::claimed_until.eq(Some(lease_until)),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;

                Ok(sf_push_queue::table
                    .filter(sf_push_queue::id.eq_any(&ids))
                    .order((
                        sf_push_queue::next_attempt_at.asc(),
                        sf_push_queue::enqueued_at.asc(),
                    ))
                    .load::<PushQueueItemDB>(conn)
                    .map_err(StorageError::from)?)
            })
            .await?;

        rows.into_iter().map(PushQueueItem::try_from).collect()
    }

    async fn complete(&self, item: &PushQueueItem) -> Result<()> {
        let item_id = item.id.clone();
        let claimed_enqueued_at = to_db_timestamp(&item.enqueued_at);

        self.writer
            .exec(move |conn| {
                let Some(row) = load_row(conn, &item_id)? else {
                    return Ok(());
                };
                if row.enqueued_at == claimed_enqueued_at {
                    diesel::delete(sf_push_queue::table.find(&item_id))
                        .execute(conn)
                        .map_err(StorageError::from)?;
                } else {
                    diesel::update(sf_push_queue::table.find(&item_id))
                        .set((
                            sf_push_queue::claimed_by.eq::<Option<String>>(None),
                            sf_push_queue::claimed_until.eq::<Option<String>>(None),
                        ))
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }
                Ok(())
            })
            .await
    }

    async fn mark_failed(
        &self,
        item: &PushQueueItem,
        error: &str,
        retry_ceiling: u32,
        next_attempt_at: DateTime<Utc>,
    ) -> Result<FailOutcome> {
        let item_id = item.id.clone();
        let error = error.to_string();

        self.writer
            .exec(move |conn| {
                let row = load_row(conn, &item_id)?
                    .ok_or_else(|| Error::Storage(format!("Queue item {} not found", item_id)))?;
                let fail_count = u32::try_from(row.fail_count).unwrap_or(0).saturating_add(1);

                if exceeds_retry_ceiling(fail_count, retry_ceiling) {
                    diesel::delete(sf_push_queue::table.find(&item_id))
                        .execute(conn)
                        .map_err(StorageError::from)?;
                    return Ok(FailOutcome::DeadLettered { fail_count });
                }

                diesel::update(sf_push_queue::table.find(&item_id))
                    .set((
                        sf_push_queue::fail_count.eq(i32::try_from(fail_count).unwrap_or(i32::MAX)),
                        sf_push_queue::last_error.eq(Some(error)),
                        sf_push_queue::next_attempt_at.eq(to_db_timestamp(&next_attempt_at)),
                        sf_push_queue::claimed_by.eq::<Option<String>>(None),
                        sf_push_queue::claimed_until.eq::<Option<String>>(None),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(FailOutcome::Requeued {
                    fail_count,
                    next_attempt_at,
                })
            })
            .await
    }

    async fn release(&self, item_ids: &[String]) -> Result<usize> {
        if item_ids.is_empty() {
            return Ok(0);
        }
        let item_ids = item_ids.to_vec();

        self.writer
            .exec(move |conn| {
                Ok(
                    diesel::update(sf_push_queue::table.filter(sf_push_queue::id.eq_any(item_ids)))
                        .set((
                            sf_push_queue::claimed_by.eq::<Option<String>>(None),
                            sf_push_queue::claimed_until.eq::<Option<String>>(None),
                        ))
                        .execute(conn)
                        .map_err(StorageError::from)?,
                )
            })
            .await
    }

    fn list_items(&self, limit: i64) -> Result<Vec<PushQueueItem>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = sf_push_queue::table
            .order(sf_push_queue::enqueued_at.asc())
            .limit(limit.max(0))
            .load::<PushQueueItemDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(PushQueueItem::try_from).collect()
    }
}
