//! Repository for mapping configuration and pull state.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::upsert::excluded;
use log::debug;

use sfsync_core::mapping::{Mapping, MappingRepositoryTrait, PullState};
use sfsync_core::Result;

use super::model::{MappingDB, PullStateDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{sf_mappings, sf_pull_state};

pub struct MappingRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl MappingRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl MappingRepositoryTrait for MappingRepository {
    fn list_mappings(&self) -> Result<Vec<Mapping>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = sf_mappings::table
            .order((sf_mappings::weight.asc(), sf_mappings::id.asc()))
            .load::<MappingDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(MappingDB::into_domain).collect()
    }

    fn get_mapping(&self, mapping_id: &str) -> Result<Option<Mapping>> {
        let mut conn = get_connection(&self.pool)?;
        sf_mappings::table
            .find(mapping_id)
            .first::<MappingDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?
            .map(MappingDB::into_domain)
            .transpose()
    }

    async fn save_mapping(&self, mapping: Mapping) -> Result<Mapping> {
        mapping.validate()?;
        let row = MappingDB::from_domain(&mapping)?;

        self.writer
            .exec(move |conn| {
                diesel::insert_into(sf_mappings::table)
                    .values(&row)
                    .on_conflict(sf_mappings::id)
                    .do_update()
                    .set((
                        sf_mappings::label.eq(excluded(sf_mappings::label)),
                        sf_mappings::weight.eq(excluded(sf_mappings::weight)),
                        sf_mappings::definition.eq(excluded(sf_mappings::definition)),
                        sf_mappings::updated_at.eq(excluded(sf_mappings::updated_at)),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                debug!("[Storage] Saved mapping '{}'", row.id);
                Ok(mapping)
            })
            .await
    }

    async fn delete_mapping(&self, mapping_id: &str) -> Result<usize> {
        let mapping_id = mapping_id.to_string();
        self.writer
            .exec(move |conn| {
                diesel::delete(sf_pull_state::table.find(&mapping_id))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                let deleted = diesel::delete(sf_mappings::table.find(&mapping_id))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(deleted)
            })
            .await
    }

    fn get_pull_state(&self, mapping_id: &str) -> Result<Option<PullState>> {
        let mut conn = get_connection(&self.pool)?;
        sf_pull_state::table
            .find(mapping_id)
            .first::<PullStateDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?
            .map(PullState::try_from)
            .transpose()
    }

    async fn save_pull_state(&self, state: PullState) -> Result<()> {
        let mut row = PullStateDB::from(&state);
        row.updated_at = crate::db::to_db_timestamp(&Utc::now());

        self.writer
            .exec(move |conn| {
                diesel::insert_into(sf_pull_state::table)
                    .values(&row)
                    .on_conflict(sf_pull_state::mapping_id)
                    .do_update()
                    .set(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }
}
