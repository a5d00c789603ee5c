//! Database model for mapped objects.

use diesel::prelude::*;
use sfsync_core::mapped_object::{MappedObject, SyncAction};
use sfsync_core::{Result, Sfid};

use crate::db::{from_db_timestamp, from_db_timestamp_opt, to_db_timestamp};
use crate::errors::StorageError;

const TABLE: &str = "sf_mapped_objects";

#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::sf_mapped_objects)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MappedObjectDB {
    pub id: String,
    pub entity_type: String,
    pub local_id: String,
    pub mapping_id: String,
    pub sfid: Option<String>,
    pub last_sync_action: Option<String>,
    pub last_sync_status: bool,
    pub last_sync_message: Option<String>,
    pub entity_updated_at: Option<String>,
    pub last_sync_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&MappedObject> for MappedObjectDB {
    fn from(mapped: &MappedObject) -> Self {
        Self {
            id: mapped.id.clone(),
            entity_type: mapped.entity_type.clone(),
            local_id: mapped.local_id.clone(),
            mapping_id: mapped.mapping_id.clone(),
            sfid: mapped.sfid.as_ref().map(|s| s.as_str().to_string()),
            last_sync_action: mapped.last_sync_action.map(|a| a.as_str().to_string()),
            last_sync_status: mapped.last_sync_status,
            last_sync_message: mapped.last_sync_message.clone(),
            entity_updated_at: mapped.entity_updated_at.as_ref().map(to_db_timestamp),
            last_sync_at: mapped.last_sync_at.as_ref().map(to_db_timestamp),
            created_at: to_db_timestamp(&mapped.created_at),
            updated_at: to_db_timestamp(&mapped.updated_at),
        }
    }
}

impl TryFrom<MappedObjectDB> for MappedObject {
    type Error = sfsync_core::Error;

    fn try_from(row: MappedObjectDB) -> Result<Self> {
        let sfid = row
            .sfid
            .as_deref()
            .map(Sfid::new)
            .transpose()
            .map_err(|e| StorageError::corrupt(TABLE, format!("row {}: {}", row.id, e)))?;
        let last_sync_action = row
            .last_sync_action
            .as_deref()
            .map(str::parse::<SyncAction>)
            .transpose()
            .map_err(|e| StorageError::corrupt(TABLE, format!("row {}: {}", row.id, e)))?;

        Ok(MappedObject {
            sfid,
            last_sync_action,
            last_sync_status: row.last_sync_status,
            last_sync_message: row.last_sync_message,
            entity_updated_at: from_db_timestamp_opt(TABLE, row.entity_updated_at.as_deref())?,
            last_sync_at: from_db_timestamp_opt(TABLE, row.last_sync_at.as_deref())?,
            created_at: from_db_timestamp(TABLE, &row.created_at)?,
            updated_at: from_db_timestamp(TABLE, &row.updated_at)?,
            id: row.id,
            entity_type: row.entity_type,
            local_id: row.local_id,
            mapping_id: row.mapping_id,
        })
    }
}
