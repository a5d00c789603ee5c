//! Database model for push queue rows.

use diesel::prelude::*;
use sfsync_core::queue::{PushQueueItem, QueueOp};
use sfsync_core::Result;

use crate::db::{from_db_timestamp, from_db_timestamp_opt, to_db_timestamp};
use crate::errors::StorageError;

const TABLE: &str = "sf_push_queue";

#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::sf_push_queue)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PushQueueItemDB {
    pub id: String,
    pub mapping_id: String,
    pub entity_type: String,
    pub local_id: String,
    pub mapped_object_id: Option<String>,
    pub op: String,
    pub enqueued_at: String,
    pub fail_count: i32,
    pub last_error: Option<String>,
    pub next_attempt_at: String,
    pub claimed_by: Option<String>,
    pub claimed_until: Option<String>,
}

impl From<&PushQueueItem> for PushQueueItemDB {
    fn from(item: &PushQueueItem) -> Self {
        Self {
            id: item.id.clone(),
            mapping_id: item.mapping_id.clone(),
            entity_type: item.entity_type.clone(),
            local_id: item.local_id.clone(),
            mapped_object_id: item.mapped_object_id.clone(),
            op: item.op.as_str().to_string(),
            enqueued_at: to_db_timestamp(&item.enqueued_at),
            fail_count: i32::try_from(item.fail_count).unwrap_or(i32::MAX),
            last_error: item.last_error.clone(),
            next_attempt_at: to_db_timestamp(&item.next_attempt_at),
            claimed_by: item.claimed_by.clone(),
            claimed_until: item.claimed_until.as_ref().map(to_db_timestamp),
        }
    }
}

impl TryFrom<PushQueueItemDB> for PushQueueItem {
    type Error = sfsync_core::Error;

    fn try_from(row: PushQueueItemDB) -> Result<Self> {
        let op = row
            .op
            .parse::<QueueOp>()
            .map_err(|e| StorageError::corrupt(TABLE, format!("row {}: {}", row.id, e)))?;

        Ok(PushQueueItem {
            op,
            enqueued_at: from_db_timestamp(TABLE, &row.enqueued_at)?,
            fail_count: u32::try_from(row.fail_count).unwrap_or(0),
            next_attempt_at: from_db_timestamp(TABLE, &row.next_attempt_at)?,
            claimed_until: from_db_timestamp_opt(TABLE, row.claimed_until.as_deref())?,
            id: row.id,
            mapping_id: row.mapping_id,
            entity_type: row.entity_type,
            local_id: row.local_id,
            mapped_object_id: row.mapped_object_id,
            last_error: row.last_error,
            claimed_by: row.claimed_by,
        })
    }
}
