//! Push and pull orchestration for a single record and mapping.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde_json::Value;

use crate::errors::{Error, Result};
use crate::events::{NoOpEventSink, SyncEvent, SyncEventSink};
use crate::fields::{build_plugin, push_value, FieldMappingPlugin, PluginContext};
use crate::local::{LocalRecord, LocalStore};
use crate::mapped_object::{MappedObject, MappedObjectRepositoryTrait, SyncAction};
use crate::mapping::{Mapping, MappingRepositoryTrait};
use crate::queue::{NewPushQueueItem, PushQueueItem, PushQueueRepositoryTrait, QueueOp};
use crate::remote::{ObjectMetadata, PushParams, RemoteRecord, SalesforceApiTrait};
use crate::settings::SyncSettings;
use crate::sfid::Sfid;
use crate::soql::{SelectQuery, SortDirection};

/// Observes or rewrites outbound push parameters before they are sent.
pub trait PushParamsHook: Send + Sync {
    fn alter_push_params(
        &self,
        params: &mut PushParams,
        record: &LocalRecord,
        mapping: &Mapping,
    ) -> Result<()>;
}

/// Remote call chosen for a push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushAction {
    Upsert { key_field: String },
    Update(Sfid),
    Create,
}

impl PushAction {
    /// Upsert key first, then a stored remote id, else create.
    pub fn decide(mapping: &Mapping, mapped: Option<&MappedObject>) -> Self {
        if let Some(key) = mapping.upsert_key() {
            return PushAction::Upsert {
                key_field: key.to_string(),
            };
        }
        match mapped.and_then(|m| m.sfid.clone()) {
            Some(sfid) => PushAction::Update(sfid),
            None => PushAction::Create,
        }
    }

    fn attempted_action(&self) -> SyncAction {
        match self {
            PushAction::Create => SyncAction::PushCreate,
            PushAction::Update(_) | PushAction::Upsert { .. } => SyncAction::PushUpdate,
        }
    }
}

/// Result of [`SyncEngine::pull`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    Applied {
        local_id: String,
        mapped_object: MappedObject,
    },
    /// No remote record could be resolved; nothing was changed.
    NoRemoteRecord,
}

pub struct SyncEngine {
    pub(crate) remote: Arc<dyn SalesforceApiTrait>,
    pub(crate) local_store: Arc<dyn LocalStore>,
    pub(crate) mappings: Arc<dyn MappingRepositoryTrait>,
    pub(crate) mapped_objects: Arc<dyn MappedObjectRepositoryTrait>,
    pub(crate) queue: Arc<dyn PushQueueRepositoryTrait>,
    pub(crate) events: Arc<dyn SyncEventSink>,
    push_params_hooks: Vec<Arc<dyn PushParamsHook>>,
    pub(crate) settings: SyncSettings,
}

impl SyncEngine {
    pub fn new(
        remote: Arc<dyn SalesforceApiTrait>,
        local_store: Arc<dyn LocalStore>,
        mappings: Arc<dyn MappingRepositoryTrait>,
        mapped_objects: Arc<dyn MappedObjectRepositoryTrait>,
        queue: Arc<dyn PushQueueRepositoryTrait>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            remote,
            local_store,
            mappings,
            mapped_objects,
            queue,
            events: Arc::new(NoOpEventSink),
            push_params_hooks: Vec::new(),
            settings,
        }
    }

    pub fn with_event_sink(mut self, events: Arc<dyn SyncEventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_push_params_hook(mut self, hook: Arc<dyn PushParamsHook>) -> Self {
        self.push_params_hooks.push(hook);
        self
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub(crate) fn report(&self, event: SyncEvent) {
        self.events.report(event);
    }

    /// Describe of the mapping's object. Failures degrade to `None` with a warning.
    async fn metadata(&self, mapping: &Mapping) -> Option<Arc<ObjectMetadata>> {
        match self.remote.describe(&mapping.salesforce_object, false).await {
            Ok(metadata) => Some(metadata),
            Err(err) => {
                warn!(
                    "[SfPush] Describe of {} failed, sending values unconverted: {}",
                    mapping.salesforce_object, err
                );
                self.report(
                    SyncEvent::warning("Could not describe {object}: {message}")
                        .with("object", &mapping.salesforce_object)
                        .with("message", &err),
                );
                None
            }
        }
    }

    fn context<'a>(
        &'a self,
        metadata: Option<&'a ObjectMetadata>,
        mapped: Option<&'a MappedObject>,
    ) -> PluginContext<'a> {
        PluginContext {
            mapped_objects: self.mapped_objects.as_ref(),
            local_store: self.local_store.as_ref(),
            events: self.events.as_ref(),
            metadata,
            mapped_object: mapped,
        }
    }

    /// Outbound field map for `record`, after every registered hook has run.
    pub async fn build_push_params(
        &self,
        record: &LocalRecord,
        mapping: &Mapping,
        mapped: Option<&MappedObject>,
    ) -> Result<PushParams> {
        let metadata = self.metadata(mapping).await;
        let ctx = self.context(metadata.as_deref(), mapped);

        let mut params = PushParams::new();
        for field in &mapping.field_mappings {
            let plugin = build_plugin(field);
            if !plugin.push() {
                continue;
            }
            let value = push_value(plugin.as_ref(), record, mapping, &ctx).await?;
            params.insert(field.salesforce_field.clone(), value);
        }

        for hook in &self.push_params_hooks {
            hook.alter_push_params(&mut params, record, mapping)?;
        }
        Ok(params)
    }

    /// Push a local record. Returns the remote id when one is known.
    ///
    /// `mapped` is the persisted mapped object for this record and mapping,
    /// if any. A failure is recorded on it before the error is returned; with
    /// no existing mapped object nothing is persisted.
    pub async fn push(
        &self,
        record: &LocalRecord,
        mapping: &Mapping,
        mapped: Option<MappedObject>,
    ) -> Result<Option<Sfid>> {
        mapping.validate()?;
        let local_id = record
            .id
            .clone()
            .ok_or_else(|| Error::invalid_request("Cannot push a record that has not been saved"))?;

        let action = PushAction::decide(mapping, mapped.as_ref());
        let result = self.send_push(record, mapping, mapped.as_ref(), &action).await;

        match result {
            Ok((sfid, sync_action)) => {
                let mut mapped = mapped
                    .unwrap_or_else(|| MappedObject::new(&record.entity_type, &local_id, &mapping.id));
                if let Some(sfid) = &sfid {
                    mapped.sfid = Some(sfid.clone());
                }
                mapped.entity_updated_at = record.updated_at;
                mapped.mark_success(sync_action);
                let mapped = self.mapped_objects.save(mapped).await?;
                info!(
                    "[SfPush] {} {} {} -> {} {}",
                    sync_action,
                    record.entity_type,
                    local_id,
                    mapping.salesforce_object,
                    mapped.sfid.as_ref().map(Sfid::as_str).unwrap_or("-")
                );
                Ok(mapped.sfid)
            }
            Err(err) => {
                self.report(
                    SyncEvent::error(
                        "Push of {entity_type} {local_id} to {object} failed: {message}",
                    )
                    .with("entity_type", &record.entity_type)
                    .with("local_id", &local_id)
                    .with("object", &mapping.salesforce_object)
                    .with("message", &err),
                );
                if let Some(mut mapped) = mapped {
                    mapped.mark_failure(action.attempted_action(), &err.to_string());
                    if let Err(save_err) = self.mapped_objects.save(mapped).await {
                        warn!("[SfPush] Could not record push failure: {}", save_err);
                    }
                }
                Err(err)
            }
        }
    }

    async fn send_push(
        &self,
        record: &LocalRecord,
        mapping: &Mapping,
        mapped: Option<&MappedObject>,
        action: &PushAction,
    ) -> Result<(Option<Sfid>, SyncAction)> {
        let params = self.build_push_params(record, mapping, mapped).await?;
        let object = &mapping.salesforce_object;

        match action {
            PushAction::Upsert { key_field } => {
                let key_value = params
                    .get(key_field)
                    .and_then(scalar_key)
                    .ok_or_else(|| {
                        Error::invalid_request(format!(
                            "Upsert key {} has no value for {} {}",
                            key_field,
                            record.entity_type,
                            record.id_str()
                        ))
                    })?;
                let result = self
                    .remote
                    .upsert(object, key_field, &key_value, &params)
                    .await?;
                let action = if result.created {
                    SyncAction::PushCreate
                } else {
                    SyncAction::PushUpdate
                };
                let sfid = result.id.or_else(|| mapped.and_then(|m| m.sfid.clone()));
                Ok((sfid, action))
            }
            PushAction::Update(sfid) => {
                self.remote.update(object, sfid, &params).await?;
                Ok((Some(sfid.clone()), SyncAction::PushUpdate))
            }
            PushAction::Create => {
                let sfid = self.remote.create(object, &params).await?;
                Ok((Some(sfid), SyncAction::PushCreate))
            }
        }
    }

    /// Delete the remote record, then record and remove the mapped object.
    pub async fn push_delete(&self, mut mapped: MappedObject, mapping: &Mapping) -> Result<()> {
        if let Some(sfid) = mapped.sfid.clone() {
            if let Err(err) = self
                .remote
                .delete(&mapping.salesforce_object, &sfid, false)
                .await
            {
                self.report(
                    SyncEvent::error("Delete of {object} {sfid} failed: {message}")
                        .with("object", &mapping.salesforce_object)
                        .with("sfid", &sfid)
                        .with("message", &err),
                );
                mapped.mark_failure(SyncAction::PushDelete, &err.to_string());
                if let Err(save_err) = self.mapped_objects.save(mapped).await {
                    warn!("[SfPush] Could not record delete failure: {}", save_err);
                }
                return Err(err);
            }
            info!(
                "[SfPush] push_delete {} {} -> {} {}",
                mapped.entity_type, mapped.local_id, mapping.salesforce_object, sfid
            );
        }

        mapped.mark_success(SyncAction::PushDelete);
        let mapped = self.mapped_objects.save(mapped).await?;
        self.mapped_objects.delete(&mapped.id).await?;
        Ok(())
    }

    /// Apply a remote record onto `record`.
    ///
    /// Without `remote`, the record is looked up by the stored remote id or
    /// the upsert key. If neither resolves, nothing changes.
    pub async fn pull(
        &self,
        mut record: LocalRecord,
        mapping: &Mapping,
        remote: Option<RemoteRecord>,
    ) -> Result<PullOutcome> {
        let mapped = match record.id.as_deref() {
            Some(local_id) => {
                self.mapped_objects
                    .find_by_local(&record.entity_type, local_id, &mapping.id)?
            }
            None => None,
        };

        let remote = match remote {
            Some(remote) => remote,
            None => match self.resolve_remote(&record, mapping, mapped.as_ref()).await? {
                Some(remote) => remote,
                None => {
                    self.report(
                        SyncEvent::notice(
                            "Nothing to pull for {entity_type} {local_id}: no {object} record found",
                        )
                        .with("entity_type", &record.entity_type)
                        .with("local_id", record.id_str())
                        .with("object", &mapping.salesforce_object),
                    );
                    return Ok(PullOutcome::NoRemoteRecord);
                }
            },
        };

        let local_id = match self
            .apply_remote(&mut record, mapping, &remote, mapped.as_ref())
            .await
        {
            Ok(local_id) => local_id,
            Err(err) => {
                self.report(
                    SyncEvent::error(
                        "Pull of {object} into {entity_type} {local_id} failed: {message}",
                    )
                    .with("object", &mapping.salesforce_object)
                    .with("entity_type", &record.entity_type)
                    .with("local_id", record.id_str())
                    .with("message", &err),
                );
                if let Some(mut mapped) = mapped {
                    mapped.mark_failure(SyncAction::Pull, &err.to_string());
                    if let Err(save_err) = self.mapped_objects.save(mapped).await {
                        warn!("[SfPull] Could not record pull failure: {}", save_err);
                    }
                }
                return Err(err);
            }
        };

        let mut mapped = mapped
            .unwrap_or_else(|| MappedObject::new(&record.entity_type, &local_id, &mapping.id));
        if let Some(sfid) = remote.id() {
            mapped.sfid = Some(sfid);
        }
        mapped.entity_updated_at = Some(Utc::now());
        mapped.mark_success(SyncAction::Pull);
        let mapped_object = self.mapped_objects.save(mapped).await?;

        debug!(
            "[SfPull] {} {} <- {}",
            record.entity_type, local_id, mapping.salesforce_object
        );
        Ok(PullOutcome::Applied {
            local_id,
            mapped_object,
        })
    }

    /// Write every pulled field onto `record` and save it.
    ///
    /// A field that cannot be read or written is reported and skipped; only
    /// auth failures and the final save abort.
    async fn apply_remote(
        &self,
        record: &mut LocalRecord,
        mapping: &Mapping,
        remote: &RemoteRecord,
        mapped: Option<&MappedObject>,
    ) -> Result<String> {
        let metadata = self.remote.describe(&mapping.salesforce_object, false).await.ok();
        let ctx = self.context(metadata.as_deref(), mapped);
        for field in &mapping.field_mappings {
            let plugin = build_plugin(field);
            if !plugin.pull() {
                continue;
            }
            if !remote.has_field(&field.salesforce_field) {
                debug!(
                    "[SfPull] {} has no field {}, skipping",
                    mapping.salesforce_object, field.salesforce_field
                );
                continue;
            }
            let snapshot = record.clone();
            let applied = match plugin.pull_value(remote, &snapshot, mapping, &ctx).await {
                Ok(value) => record.set(&field.local_field, value),
                Err(err) => Err(err),
            };
            match applied {
                Ok(()) => {}
                Err(err) if err.is_auth_failure() => return Err(err),
                Err(err) => {
                    if !err.is_skippable_field_error() {
                        warn!(
                            "[SfPull] {} -> {} failed: {}",
                            field.salesforce_field, field.local_field, err
                        );
                    }
                    self.report(
                        SyncEvent::warning(
                            "Skipped {field} while pulling into {entity_type} {local_id}: {message}",
                        )
                        .with("field", &field.salesforce_field)
                        .with("entity_type", &record.entity_type)
                        .with("local_id", record.id_str())
                        .with("message", &err),
                    );
                }
            }
        }

        self.local_store.save(record).await
    }

    async fn resolve_remote(
        &self,
        record: &LocalRecord,
        mapping: &Mapping,
        mapped: Option<&MappedObject>,
    ) -> Result<Option<RemoteRecord>> {
        if let Some(sfid) = mapped.and_then(|m| m.sfid.as_ref()) {
            return self.remote.object_read(&mapping.salesforce_object, sfid).await;
        }

        let (Some(key_field), Some(key_mapping)) = (mapping.upsert_key(), mapping.key_field_mapping())
        else {
            return Ok(None);
        };
        let ctx = self.context(None, mapped);
        let plugin = build_plugin(key_mapping);
        let Some(key_value) = scalar_key(&plugin.value(record, mapping, &ctx).await?) else {
            return Ok(None);
        };
        self.remote
            .object_read_by_external_id(&mapping.salesforce_object, key_field, &key_value)
            .await
    }

    /// Incremental pull query for a mapping.
    ///
    /// Selects every pulled field plus `Id` and the trigger-date field,
    /// bounded below by `since` and ordered by the trigger date so an
    /// interrupted run resumes without gaps.
    pub fn build_pull_query(
        &self,
        mapping: &Mapping,
        since: Option<DateTime<Utc>>,
    ) -> Result<SelectQuery> {
        let trigger = mapping.pull_trigger_date.as_str();
        let mut query = SelectQuery::new(&mapping.salesforce_object);
        query.field("Id");
        for field in &mapping.field_mappings {
            if build_plugin(field).pull() {
                query.field(&field.salesforce_field);
            }
        }
        query.field(trigger);

        if let Some(since) = since {
            query.add_condition(trigger, since, ">")?;
        }
        if let Some(clause) = mapping.pull_where_clause.as_deref() {
            query.add_raw_condition(clause);
        }
        query.order(trigger, SortDirection::Asc);
        query.limit = Some(self.settings.pull_max_records);
        Ok(query)
    }

    /// Host hook for local create/update/delete events.
    ///
    /// Async mappings enqueue; others push inline and enqueue on failure.
    /// Mapped objects of deleted records are removed unless a queued delete
    /// still needs them.
    pub async fn on_local_event(&self, record: &LocalRecord, op: QueueOp) -> Result<()> {
        let Some(local_id) = record.id.as_deref() else {
            return Err(Error::invalid_request("Local event for an unsaved record"));
        };
        let mut kept_for_queue = Vec::new();

        for mapping in self.mappings.mappings_for(&record.entity_type, &record.bundle)? {
            if !mapping.sync_triggers.allows_push(op) {
                continue;
            }
            let mapped = self
                .mapped_objects
                .find_by_local(&record.entity_type, local_id, &mapping.id)?;

            if op == QueueOp::Delete {
                let Some(mapped) = mapped else {
                    continue;
                };
                if mapping.async_push {
                    kept_for_queue.push(mapped.id.clone());
                    self.enqueue(&mapping, record, Some(&mapped), op).await?;
                } else if let Err(err) = self.push_delete(mapped.clone(), &mapping).await {
                    warn!("[SfPush] Delete of {} failed, queued for retry: {}", mapped.id, err);
                    kept_for_queue.push(mapped.id.clone());
                    self.enqueue(&mapping, record, Some(&mapped), op).await?;
                }
                continue;
            }

            if mapping.async_push {
                self.enqueue(&mapping, record, mapped.as_ref(), op).await?;
                continue;
            }
            let mapped_id = mapped.as_ref().map(|m| m.id.clone());
            if let Err(err) = self.push(record, &mapping, mapped).await {
                warn!(
                    "[SfPush] Inline push of {} {} failed, queued for retry: {}",
                    record.entity_type, local_id, err
                );
                self.queue
                    .enqueue(NewPushQueueItem {
                        mapping_id: mapping.id.clone(),
                        entity_type: record.entity_type.clone(),
                        local_id: local_id.to_string(),
                        mapped_object_id: mapped_id,
                        op,
                    })
                    .await?;
            }
        }

        if op == QueueOp::Delete {
            if kept_for_queue.is_empty() {
                self.mapped_objects
                    .delete_for_local(&record.entity_type, local_id)
                    .await?;
            } else {
                for mapped in self
                    .mapped_objects
                    .find_all_for_local(&record.entity_type, local_id)?
                {
                    if !kept_for_queue.contains(&mapped.id) {
                        self.mapped_objects.delete(&mapped.id).await?;
                    }
                }
            }
        }
        Ok(())
    }

    async fn enqueue(
        &self,
        mapping: &Mapping,
        record: &LocalRecord,
        mapped: Option<&MappedObject>,
        op: QueueOp,
    ) -> Result<PushQueueItem> {
        self.queue
            .enqueue(NewPushQueueItem {
                mapping_id: mapping.id.clone(),
                entity_type: record.entity_type.clone(),
                local_id: record.id_str().to_string(),
                mapped_object_id: mapped.map(|m| m.id.clone()),
                op,
            })
            .await
    }

    /// Retry ceiling of the item's mapping; 0 (unlimited) if it is gone.
    pub(crate) fn retry_ceiling(&self, mapping_id: &str) -> Result<u32> {
        Ok(self
            .mappings
            .get_mapping(mapping_id)?
            .map(|m| m.push_retries)
            .unwrap_or(0))
    }

    /// Run the push or delete a queue item stands for.
    pub(crate) async fn process_queue_item(&self, item: &PushQueueItem) -> Result<()> {
        let Some(mapping) = self.mappings.get_mapping(&item.mapping_id)? else {
            self.report(
                SyncEvent::warning("Dropped queued {op} for {entity_type} {local_id}: mapping {mapping} no longer exists")
                    .with("op", item.op)
                    .with("entity_type", &item.entity_type)
                    .with("local_id", &item.local_id)
                    .with("mapping", &item.mapping_id),
            );
            return Ok(());
        };

        let mapped = self
            .mapped_objects
            .find_by_local(&item.entity_type, &item.local_id, &mapping.id)?;

        match item.op {
            QueueOp::Delete => match mapped {
                Some(mapped) => self.push_delete(mapped, &mapping).await,
                None => {
                    debug!(
                        "[SfQueue] Delete of {} {} already satisfied",
                        item.entity_type, item.local_id
                    );
                    Ok(())
                }
            },
            QueueOp::Create | QueueOp::Update => {
                let Some(record) = self
                    .local_store
                    .load(&item.entity_type, &item.local_id)
                    .await?
                else {
                    self.report(
                        SyncEvent::warning("Dropped queued {op} for {entity_type} {local_id}: record no longer exists")
                            .with("op", item.op)
                            .with("entity_type", &item.entity_type)
                            .with("local_id", &item.local_id),
                    );
                    return Ok(());
                };
                self.push(&record, &mapping, mapped).await.map(|_| ())
            }
        }
    }
}

/// String form of an upsert key value; `None` when empty or not scalar.
fn scalar_key(value: &Value) -> Option<String> {
    let key = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!key.is_empty()).then_some(key)
}
