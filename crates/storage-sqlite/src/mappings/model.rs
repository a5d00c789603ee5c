//! Database models for mapping configuration and pull watermarks.

use chrono::Utc;
use diesel::prelude::*;
use sfsync_core::mapping::{Mapping, PullState};
use sfsync_core::Result;

use crate::db::{from_db_timestamp, from_db_timestamp_opt, to_db_timestamp};
use crate::errors::StorageError;

#[derive(Queryable, Identifiable, Insertable, AsChangeset, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::sf_mappings)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MappingDB {
    pub id: String,
    pub label: String,
    pub weight: i32,
    /// The full mapping as JSON.
    pub definition: String,
    pub created_at: String,
    pub updated_at: String,
}

impl MappingDB {
    pub fn from_domain(mapping: &Mapping) -> Result<Self> {
        let now = to_db_timestamp(&Utc::now());
        Ok(Self {
            id: mapping.id.clone(),
            label: mapping.label.clone(),
            weight: mapping.weight,
            definition: serde_json::to_string(mapping)?,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    pub fn into_domain(self) -> Result<Mapping> {
        serde_json::from_str(&self.definition).map_err(|e| {
            StorageError::corrupt("sf_mappings", format!("mapping '{}': {}", self.id, e)).into()
        })
    }
}

#[derive(Queryable, Identifiable, Insertable, AsChangeset, Selectable, Debug, Clone)]
#[diesel(primary_key(mapping_id))]
#[diesel(table_name = crate::schema::sf_pull_state)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct PullStateDB {
    pub mapping_id: String,
    pub last_pull_at: Option<String>,
    pub last_delete_check_at: Option<String>,
    pub updated_at: String,
}

impl From<&PullState> for PullStateDB {
    fn from(state: &PullState) -> Self {
        Self {
            mapping_id: state.mapping_id.clone(),
            last_pull_at: state.last_pull_at.as_ref().map(to_db_timestamp),
            last_delete_check_at: state.last_delete_check_at.as_ref().map(to_db_timestamp),
            updated_at: to_db_timestamp(&state.updated_at),
        }
    }
}

impl TryFrom<PullStateDB> for PullState {
    type Error = sfsync_core::Error;

    fn try_from(row: PullStateDB) -> Result<Self> {
        const TABLE: &str = "sf_pull_state";
        Ok(PullState {
            last_pull_at: from_db_timestamp_opt(TABLE, row.last_pull_at.as_deref())?,
            last_delete_check_at: from_db_timestamp_opt(TABLE, row.last_delete_check_at.as_deref())?,
            updated_at: from_db_timestamp(TABLE, &row.updated_at)?,
            mapping_id: row.mapping_id,
        })
    }
}
