use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::remote_model::{DeletedResult, ObjectMetadata, QueryResult, RemoteRecord, UpsertResult};
use crate::errors::Result;
use crate::sfid::Sfid;
use crate::soql::SoqlStatement;

/// Outbound field/value map for create, update and upsert.
pub type PushParams = Map<String, Value>;

/// The remote operations the sync engine and field plugins rely on.
#[async_trait]
pub trait SalesforceApiTrait: Send + Sync {
    /// Create a record and return its id.
    async fn create(&self, object: &str, params: &PushParams) -> Result<Sfid>;

    /// Update a record. The remote returns no payload; `Ok` means success.
    async fn update(&self, object: &str, id: &Sfid, params: &PushParams) -> Result<()>;

    /// Create-or-update by external id. `key_field` is removed from `params`
    /// before sending since it is already part of the request path.
    async fn upsert(
        &self,
        object: &str,
        key_field: &str,
        key_value: &str,
        params: &PushParams,
    ) -> Result<UpsertResult>;

    /// Delete a record. A 404 counts as success unless `throw_on_404`.
    async fn delete(&self, object: &str, id: &Sfid, throw_on_404: bool) -> Result<()>;

    /// Read one record; `None` when it does not exist.
    async fn object_read(&self, object: &str, id: &Sfid) -> Result<Option<RemoteRecord>>;

    async fn object_read_by_external_id(
        &self,
        object: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<RemoteRecord>>;

    /// Object describe, served from cache unless `force_refresh`.
    async fn describe(&self, object: &str, force_refresh: bool) -> Result<Arc<ObjectMetadata>>;

    async fn query(&self, query: &dyn SoqlStatement) -> Result<QueryResult>;

    /// Fetch the page behind a `nextRecordsUrl`.
    async fn query_more(&self, next_records_url: &str) -> Result<QueryResult>;

    /// Run a query and follow pagination until the result set is exhausted.
    async fn query_all(&self, query: &dyn SoqlStatement) -> Result<QueryResult> {
        let mut result = self.query(query).await?;
        while result.has_more() {
            let Some(next_url) = result.next_records_url.take() else {
                break;
            };
            let page = self.query_more(&next_url).await?;
            result.records.extend(page.records);
            result.done = page.done;
            result.next_records_url = page.next_records_url;
        }
        Ok(result)
    }

    /// Records of `object` deleted between `start` and `end`.
    async fn get_deleted(
        &self,
        object: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<DeletedResult>;
}
