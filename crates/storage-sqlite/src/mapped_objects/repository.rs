//! Repository for mapped objects.

use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::upsert::excluded;

use sfsync_core::mapped_object::{MappedObject, MappedObjectRepositoryTrait};
use sfsync_core::{Result, Sfid};

use super::model::MappedObjectDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::sf_mapped_objects::dsl::*;

pub struct MappedObjectRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl MappedObjectRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }

    fn load_where<F>(&self, query: F) -> Result<Vec<MappedObject>>
    where
        F: FnOnce(&mut SqliteConnection) -> QueryResult<Vec<MappedObjectDB>>,
    {
        let mut conn = get_connection(&self.pool)?;
        let rows = query(&mut *conn).map_err(StorageError::from)?;
        rows.into_iter().map(MappedObject::try_from).collect()
    }
}

#[async_trait]
impl MappedObjectRepositoryTrait for MappedObjectRepository {
    fn get(&self, mapped_id: &str) -> Result<Option<MappedObject>> {
        Ok(self
            .load_where(|conn| sf_mapped_objects.find(mapped_id).load(conn))?
            .pop())
    }

    fn find_by_local(
        &self,
        entity: &str,
        local: &str,
        mapping: &str,
    ) -> Result<Option<MappedObject>> {
        Ok(self
            .load_where(|conn| {
                sf_mapped_objects
                    .filter(entity_type.eq(entity))
                    .filter(local_id.eq(local))
                    .filter(mapping_id.eq(mapping))
                    .load(conn)
            })?
            .pop())
    }

    fn find_by_sfid(&self, remote_id: &Sfid) -> Result<Vec<MappedObject>> {
        self.load_where(|conn| {
            sf_mapped_objects
                .filter(sfid.eq(remote_id.as_str()))
                .order(created_at.asc())
                .load(conn)
        })
    }

    fn find_all_for_local(&self, entity: &str, local: &str) -> Result<Vec<MappedObject>> {
        self.load_where(|conn| {
            sf_mapped_objects
                .filter(entity_type.eq(entity))
                .filter(local_id.eq(local))
                .order(mapping_id.asc())
                .load(conn)
        })
    }

    async fn save(&self, mapped: MappedObject) -> Result<MappedObject> {
        let row = MappedObjectDB::from(&mapped);

        let saved = self
            .writer
            .exec(move |conn| {
                diesel::insert_into(sf_mapped_objects)
                    .values(&row)
                    .on_conflict((entity_type, local_id, mapping_id))
                    .do_update()
                    .set((
                        sfid.eq(excluded(sfid)),
                        last_sync_action.eq(excluded(last_sync_action)),
                        last_sync_status.eq(excluded(last_sync_status)),
                        last_sync_message.eq(excluded(last_sync_message)),
                        entity_updated_at.eq(excluded(entity_updated_at)),
                        last_sync_at.eq(excluded(last_sync_at)),
                        updated_at.eq(excluded(updated_at)),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;

                let stored = sf_mapped_objects
                    .filter(entity_type.eq(&row.entity_type))
                    .filter(local_id.eq(&row.local_id))
                    .filter(mapping_id.eq(&row.mapping_id))
                    .first::<MappedObjectDB>(conn)
                    .map_err(StorageError::from)?;
                Ok(stored)
            })
            .await?;

        MappedObject::try_from(saved)
    }

    async fn delete(&self, mapped_id: &str) -> Result<usize> {
        let mapped_id = mapped_id.to_string();
        self.writer
            .exec(move |conn| {
                Ok(diesel::delete(sf_mapped_objects.find(mapped_id))
                    .execute(conn)
                    .map_err(StorageError::from)?)
            })
            .await
    }

    async fn delete_for_local(&self, entity: &str, local: &str) -> Result<usize> {
        let (entity, local) = (entity.to_string(), local.to_string());
        self.writer
            .exec(move |conn| {
                Ok(diesel::delete(
                    sf_mapped_objects
                        .filter(entity_type.eq(entity))
                        .filter(local_id.eq(local)),
                )
                .execute(conn)
                .map_err(StorageError::from)?)
            })
            .await
    }
}
