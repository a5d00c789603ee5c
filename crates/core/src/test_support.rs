//! In-memory fakes for engine, queue and plugin tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::errors::{Error, Result};
use crate::local::{LocalFieldDefinition, LocalRecord, LocalStore};
use crate::mapped_object::{MappedObject, MappedObjectRepositoryTrait};
use crate::mapping::{Mapping, MappingRepositoryTrait, PullState};
use crate::queue::{
    exceeds_retry_ceiling, FailOutcome, NewPushQueueItem, PushQueueItem, PushQueueRepositoryTrait,
};
use crate::remote::{
    DeletedRecord, DeletedResult, ObjectMetadata, PushParams, QueryResult, RemoteRecord,
    SalesforceApiTrait, UpsertResult,
};
use crate::sfid::Sfid;
use crate::soql::SoqlStatement;

pub fn sfid(n: u32) -> Sfid {
    Sfid::new(&format!("001000000000{:03}", n)).unwrap()
}

pub fn remote_record(fields: Value) -> RemoteRecord {
    serde_json::from_value(fields).unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Remote
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeSalesforce {
    calls: Mutex<Vec<String>>,
    params: Mutex<Vec<PushParams>>,
    metadata: Mutex<HashMap<String, ObjectMetadata>>,
    records: Mutex<HashMap<String, RemoteRecord>>,
    external: Mutex<HashMap<(String, String), Sfid>>,
    failures: Mutex<VecDeque<Error>>,
    pages: Mutex<VecDeque<QueryResult>>,
    deleted: Mutex<Vec<DeletedRecord>>,
    next_id: AtomicU64,
}

impl FakeSalesforce {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(500),
            ..Self::default()
        }
    }

    pub fn with_metadata(self, metadata: ObjectMetadata) -> Self {
        self.metadata
            .lock()
            .unwrap()
            .insert(metadata.name.clone(), metadata);
        self
    }

    pub fn with_record(self, record: RemoteRecord) -> Self {
        let id = record.id().unwrap();
        self.records.lock().unwrap().insert(id.to_string(), record);
        self
    }

    pub fn with_external(self, field: &str, value: &str, id: Sfid) -> Self {
        self.external
            .lock()
            .unwrap()
            .insert((field.to_string(), value.to_string()), id);
        self
    }

    pub fn with_page(self, page: QueryResult) -> Self {
        self.pages.lock().unwrap().push_back(page);
        self
    }

    pub fn with_deleted(self, id: Sfid) -> Self {
        self.deleted.lock().unwrap().push(DeletedRecord {
            id,
            deleted_date: "2024-03-01T10:00:00.000+0000".to_string(),
        });
        self
    }

    pub fn fail_next(&self, error: Error) {
        self.failures.lock().unwrap().push_back(error);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    pub fn last_params(&self) -> Option<PushParams> {
        self.params.lock().unwrap().last().cloned()
    }

    fn record_call(&self, call: String) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        match self.failures.lock().unwrap().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn new_id(&self) -> Sfid {
        sfid(self.next_id.fetch_add(1, Ordering::SeqCst) as u32)
    }

    fn store(&self, id: &Sfid, params: &PushParams) {
        let mut fields = params.clone();
        fields.insert("Id".to_string(), json!(id.to_string()));
        self.records
            .lock()
            .unwrap()
            .insert(id.to_string(), RemoteRecord::new(fields));
    }
}

#[async_trait]
impl SalesforceApiTrait for FakeSalesforce {
    async fn create(&self, object: &str, params: &PushParams) -> Result<Sfid> {
        self.record_call(format!("create:{}", object))?;
        self.params.lock().unwrap().push(params.clone());
        let id = self.new_id();
        self.store(&id, params);
        Ok(id)
    }

    async fn update(&self, object: &str, id: &Sfid, params: &PushParams) -> Result<()> {
        self.record_call(format!("update:{}:{}", object, id))?;
        self.params.lock().unwrap().push(params.clone());
        self.store(id, params);
        Ok(())
    }

    async fn upsert(
        &self,
        object: &str,
        key_field: &str,
        key_value: &str,
        params: &PushParams,
    ) -> Result<UpsertResult> {
        self.record_call(format!("upsert:{}:{}:{}", object, key_field, key_value))?;
        let mut sent = params.clone();
        sent.remove(key_field);
        self.params.lock().unwrap().push(sent);

        let key = (key_field.to_string(), key_value.to_string());
        let existing = self.external.lock().unwrap().get(&key).cloned();
        match existing {
            Some(id) => {
                self.store(&id, params);
                Ok(UpsertResult {
                    id: Some(id),
                    created: false,
                })
            }
            None => {
                let id = self.new_id();
                self.store(&id, params);
                self.external.lock().unwrap().insert(key, id.clone());
                Ok(UpsertResult {
                    id: Some(id),
                    created: true,
                })
            }
        }
    }

    async fn delete(&self, object: &str, id: &Sfid, _throw_on_404: bool) -> Result<()> {
        self.record_call(format!("delete:{}:{}", object, id))?;
        self.records.lock().unwrap().remove(id.as_str());
        Ok(())
    }

    async fn object_read(&self, object: &str, id: &Sfid) -> Result<Option<RemoteRecord>> {
        self.record_call(format!("read:{}:{}", object, id))?;
        Ok(self.records.lock().unwrap().get(id.as_str()).cloned())
    }

    async fn object_read_by_external_id(
        &self,
        object: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<RemoteRecord>> {
        self.record_call(format!("read_external:{}:{}:{}", object, field, value))?;
        let id = self
            .external
            .lock()
            .unwrap()
            .get(&(field.to_string(), value.to_string()))
            .cloned();
        Ok(id.and_then(|id| self.records.lock().unwrap().get(id.as_str()).cloned()))
    }

    async fn describe(&self, object: &str, _force_refresh: bool) -> Result<Arc<ObjectMetadata>> {
        self.calls.lock().unwrap().push(format!("describe:{}", object));
        self.metadata
            .lock()
            .unwrap()
            .get(object)
            .cloned()
            .map(Arc::new)
            .ok_or_else(|| Error::remote_api("NOT_FOUND", format!("No describe for {}", object)))
    }

    async fn query(&self, query: &dyn SoqlStatement) -> Result<QueryResult> {
        self.record_call(format!("query:{}", query.soql()))?;
        Ok(self.pages.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn query_more(&self, next_records_url: &str) -> Result<QueryResult> {
        self.record_call(format!("query_more:{}", next_records_url))?;
        Ok(self.pages.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn get_deleted(
        &self,
        object: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<DeletedResult> {
        self.record_call(format!("get_deleted:{}", object))?;
        Ok(DeletedResult {
            deleted_records: self.deleted.lock().unwrap().clone(),
            ..DeletedResult::default()
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Local store
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryLocalStore {
    records: Mutex<HashMap<(String, String), LocalRecord>>,
    definitions: Mutex<HashMap<String, LocalFieldDefinition>>,
    terms: Mutex<Vec<(String, String, String)>>,
    next_id: AtomicU64,
    saves: AtomicU64,
    fail_saves: Mutex<bool>,
    rejected_values: Mutex<Vec<(String, Value)>>,
    fail_terms: Mutex<bool>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(100),
            ..Self::default()
        }
    }

    pub fn with_record(self, record: LocalRecord) -> Self {
        let key = (record.entity_type.clone(), record.id_str().to_string());
        self.records.lock().unwrap().insert(key, record);
        self
    }

    pub fn with_definition(self, selector: &str, definition: LocalFieldDefinition) -> Self {
        self.definitions
            .lock()
            .unwrap()
            .insert(selector.to_string(), definition);
        self
    }

    pub fn with_term(self, vocabulary: &str, id: &str, name: &str) -> Self {
        self.terms
            .lock()
            .unwrap()
            .push((vocabulary.to_string(), id.to_string(), name.to_string()));
        self
    }

    pub fn fail_saves(&self) {
        *self.fail_saves.lock().unwrap() = true;
    }

    /// Reject saves of records whose `selector` holds `value`.
    pub fn reject_saves_with(&self, selector: &str, value: Value) {
        self.rejected_values
            .lock()
            .unwrap()
            .push((selector.to_string(), value));
    }

    pub fn fail_term_lookups(&self) {
        *self.fail_terms.lock().unwrap() = true;
    }

    pub fn record(&self, entity_type: &str, id: &str) -> Option<LocalRecord> {
        self.records
            .lock()
            .unwrap()
            .get(&(entity_type.to_string(), id.to_string()))
            .cloned()
    }

    pub fn record_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn save_count(&self) -> u64 {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn terms(&self, vocabulary: &str) -> Vec<(String, String)> {
        self.terms
            .lock()
            .unwrap()
            .iter()
            .filter(|(v, _, _)| v == vocabulary)
            .map(|(_, id, name)| (id.clone(), name.clone()))
            .collect()
    }
}

#[async_trait]
impl LocalStore for MemoryLocalStore {
    async fn load(&self, entity_type: &str, id: &str) -> Result<Option<LocalRecord>> {
        Ok(self.record(entity_type, id))
    }

    async fn save(&self, record: &mut LocalRecord) -> Result<String> {
        if *self.fail_saves.lock().unwrap() {
            return Err(Error::local_store("save rejected"));
        }
        let rejected = self
            .rejected_values
            .lock()
            .unwrap()
            .iter()
            .any(|(selector, value)| record.get(selector) == Some(value));
        if rejected {
            return Err(Error::local_store("save rejected"));
        }
        if record.id.is_none() {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
            record.id = Some(id);
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        let id = record.id_str().to_string();
        self.records
            .lock()
            .unwrap()
            .insert((record.entity_type.clone(), id.clone()), record.clone());
        Ok(id)
    }

    async fn delete(&self, record: &LocalRecord) -> Result<()> {
        self.records
            .lock()
            .unwrap()
            .remove(&(record.entity_type.clone(), record.id_str().to_string()));
        Ok(())
    }

    fn field_definition(
        &self,
        _entity_type: &str,
        _bundle: &str,
        selector: &str,
    ) -> Option<LocalFieldDefinition> {
        self.definitions.lock().unwrap().get(selector).cloned()
    }

    async fn term_name(&self, vocabulary: &str, term_id: &str) -> Result<Option<String>> {
        Ok(self
            .terms(vocabulary)
            .into_iter()
            .find(|(id, _)| id == term_id)
            .map(|(_, name)| name))
    }

    async fn find_or_create_term(&self, vocabulary: &str, name: &str) -> Result<String> {
        if *self.fail_terms.lock().unwrap() {
            return Err(Error::Storage("term index unavailable".to_string()));
        }
        if let Some((id, _)) = self
            .terms(vocabulary)
            .into_iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(name))
        {
            return Ok(id);
        }
        let id = format!("t{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.terms
            .lock()
            .unwrap()
            .push((vocabulary.to_string(), id.clone(), name.to_string()));
        Ok(id)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Repositories
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryMappedObjectRepository {
    rows: Mutex<Vec<MappedObject>>,
}

impl MemoryMappedObjectRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, mapped: MappedObject) -> Self {
        self.rows.lock().unwrap().push(mapped);
        self
    }

    pub fn all(&self) -> Vec<MappedObject> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl MappedObjectRepositoryTrait for MemoryMappedObjectRepository {
    fn get(&self, id: &str) -> Result<Option<MappedObject>> {
        Ok(self.all().into_iter().find(|m| m.id == id))
    }

    fn find_by_local(
        &self,
        entity_type: &str,
        local_id: &str,
        mapping_id: &str,
    ) -> Result<Option<MappedObject>> {
        Ok(self.all().into_iter().find(|m| {
            m.entity_type == entity_type && m.local_id == local_id && m.mapping_id == mapping_id
        }))
    }

    fn find_by_sfid(&self, sfid: &Sfid) -> Result<Vec<MappedObject>> {
        Ok(self
            .all()
            .into_iter()
            .filter(|m| m.sfid.as_ref() == Some(sfid))
            .collect())
    }

    fn find_all_for_local(&self, entity_type: &str, local_id: &str) -> Result<Vec<MappedObject>> {
        Ok(self
            .all()
            .into_iter()
            .filter(|m| m.entity_type == entity_type && m.local_id == local_id)
            .collect())
    }

    async fn save(&self, mut mapped: MappedObject) -> Result<MappedObject> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(existing) = rows.iter_mut().find(|m| {
            m.entity_type == mapped.entity_type
                && m.local_id == mapped.local_id
                && m.mapping_id == mapped.mapping_id
        }) {
            mapped.id = existing.id.clone();
            *existing = mapped.clone();
        } else {
            rows.push(mapped.clone());
        }
        Ok(mapped)
    }

    async fn delete(&self, id: &str) -> Result<usize> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|m| m.id != id);
        Ok(before - rows.len())
    }

    async fn delete_for_local(&self, entity_type: &str, local_id: &str) -> Result<usize> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|m| !(m.entity_type == entity_type && m.local_id == local_id));
        Ok(before - rows.len())
    }
}

#[derive(Default)]
pub struct MemoryMappingRepository {
    mappings: Mutex<Vec<Mapping>>,
    pull_states: Mutex<HashMap<String, PullState>>,
}

impl MemoryMappingRepository {
    pub fn new(mappings: Vec<Mapping>) -> Self {
        Self {
            mappings: Mutex::new(mappings),
            ..Self::default()
        }
    }

    pub fn pull_state(&self, mapping_id: &str) -> Option<PullState> {
        self.pull_states.lock().unwrap().get(mapping_id).cloned()
    }
}

#[async_trait]
impl MappingRepositoryTrait for MemoryMappingRepository {
    fn list_mappings(&self) -> Result<Vec<Mapping>> {
        Ok(self.mappings.lock().unwrap().clone())
    }

    fn get_mapping(&self, mapping_id: &str) -> Result<Option<Mapping>> {
        Ok(self
            .list_mappings()?
            .into_iter()
            .find(|m| m.id == mapping_id))
    }

    async fn save_mapping(&self, mapping: Mapping) -> Result<Mapping> {
        let mut mappings = self.mappings.lock().unwrap();
        mappings.retain(|m| m.id != mapping.id);
        mappings.push(mapping.clone());
        Ok(mapping)
    }

    async fn delete_mapping(&self, mapping_id: &str) -> Result<usize> {
        let mut mappings = self.mappings.lock().unwrap();
        let before = mappings.len();
        mappings.retain(|m| m.id != mapping_id);
        Ok(before - mappings.len())
    }

    fn get_pull_state(&self, mapping_id: &str) -> Result<Option<PullState>> {
        Ok(self.pull_state(mapping_id))
    }

    async fn save_pull_state(&self, state: PullState) -> Result<()> {
        self.pull_states
            .lock()
            .unwrap()
            .insert(state.mapping_id.clone(), state);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryPushQueueRepository {
    items: Mutex<Vec<PushQueueItem>>,
}

impl MemoryPushQueueRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> Vec<PushQueueItem> {
        self.items.lock().unwrap().clone()
    }

    /// Make every item due now.
    pub fn make_due(&self) {
        let past = Utc::now() - Duration::seconds(1);
        for item in self.items.lock().unwrap().iter_mut() {
            item.next_attempt_at = past;
        }
    }
}

#[async_trait]
impl PushQueueRepositoryTrait for MemoryPushQueueRepository {
    async fn enqueue(&self, new_item: NewPushQueueItem) -> Result<PushQueueItem> {
        let now = Utc::now();
        let mut items = self.items.lock().unwrap();
        if let Some(existing) = items.iter_mut().find(|i| {
            i.mapping_id == new_item.mapping_id
                && i.entity_type == new_item.entity_type
                && i.local_id == new_item.local_id
        }) {
            existing.op = new_item.op;
            existing.mapped_object_id = new_item.mapped_object_id.or(existing.mapped_object_id.take());
            existing.enqueued_at = now;
            existing.next_attempt_at = now;
            return Ok(existing.clone());
        }
        let item = PushQueueItem {
            id: Uuid::new_v4().to_string(),
            mapping_id: new_item.mapping_id,
            entity_type: new_item.entity_type,
            local_id: new_item.local_id,
            mapped_object_id: new_item.mapped_object_id,
            op: new_item.op,
            enqueued_at: now,
            fail_count: 0,
            last_error: None,
            next_attempt_at: now,
            claimed_by: None,
            claimed_until: None,
        };
        items.push(item.clone());
        Ok(item)
    }

    async fn claim_batch(
        &self,
        worker_id: &str,
        limit: usize,
        lease_secs: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<PushQueueItem>> {
        let mut items = self.items.lock().unwrap();
        let mut claimed = Vec::new();
        for item in items.iter_mut().filter(|i| i.is_due_at(now)).take(limit) {
            item.claimed_by = Some(worker_id.to_string());
            item.claimed_until = Some(now + Duration::seconds(lease_secs));
            claimed.push(item.clone());
        }
        Ok(claimed)
    }

    async fn complete(&self, item: &PushQueueItem) -> Result<()> {
        let mut items = self.items.lock().unwrap();
        if let Some(pos) = items.iter().position(|i| i.id == item.id) {
            if items[pos].enqueued_at == item.enqueued_at {
                items.remove(pos);
            } else {
                items[pos].claimed_by = None;
                items[pos].claimed_until = None;
            }
        }
        Ok(())
    }

    async fn mark_failed(
        &self,
        item: &PushQueueItem,
        error: &str,
        retry_ceiling: u32,
        next_attempt_at: DateTime<Utc>,
    ) -> Result<FailOutcome> {
        let mut items = self.items.lock().unwrap();
        let Some(pos) = items.iter().position(|i| i.id == item.id) else {
            return Err(Error::Storage(format!("Queue item {} not found", item.id)));
        };
        let fail_count = items[pos].fail_count + 1;
        if exceeds_retry_ceiling(fail_count, retry_ceiling) {
            items.remove(pos);
            return Ok(FailOutcome::DeadLettered { fail_count });
        }
        let row = &mut items[pos];
        row.fail_count = fail_count;
        row.last_error = Some(error.to_string());
        row.next_attempt_at = next_attempt_at;
        row.claimed_by = None;
        row.claimed_until = None;
        Ok(FailOutcome::Requeued {
            fail_count,
            next_attempt_at,
        })
    }

    async fn release(&self, item_ids: &[String]) -> Result<usize> {
        let mut released = 0;
        for item in self.items.lock().unwrap().iter_mut() {
            if item_ids.contains(&item.id) {
                item.claimed_by = None;
                item.claimed_until = None;
                released += 1;
            }
        }
        Ok(released)
    }

    fn list_items(&self, limit: i64) -> Result<Vec<PushQueueItem>> {
        Ok(self
            .items()
            .into_iter()
            .take(limit.max(0) as usize)
            .collect())
    }
}

pub fn params(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}
