use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::json;

use super::*;
use crate::errors::Error;
use crate::events::{CollectingEventSink, EventLevel};
use crate::local::LocalRecord;
use crate::mapped_object::{MappedObject, SyncAction};
use crate::mapping::{FieldDirection, FieldMapping, FieldPluginKind, Mapping, SyncTriggers};
use crate::queue::QueueOp;
use crate::remote::{PushParams, QueryResult};
use crate::settings::SyncSettings;
use crate::soql::SoqlStatement;
use crate::test_support::{
    remote_record, sfid, FakeSalesforce, MemoryLocalStore, MemoryMappedObjectRepository,
    MemoryMappingRepository, MemoryPushQueueRepository,
};

struct Harness {
    remote: Arc<FakeSalesforce>,
    store: Arc<MemoryLocalStore>,
    mappings: Arc<MemoryMappingRepository>,
    mapped: Arc<MemoryMappedObjectRepository>,
    queue: Arc<MemoryPushQueueRepository>,
    events: Arc<CollectingEventSink>,
    settings: SyncSettings,
}

impl Harness {
    fn new(mappings: Vec<Mapping>) -> Self {
        Self {
            remote: Arc::new(FakeSalesforce::new()),
            store: Arc::new(MemoryLocalStore::new()),
            mappings: Arc::new(MemoryMappingRepository::new(mappings)),
            mapped: Arc::new(MemoryMappedObjectRepository::new()),
            queue: Arc::new(MemoryPushQueueRepository::new()),
            events: Arc::new(CollectingEventSink::new()),
            settings: SyncSettings::default(),
        }
    }

    fn with_settings(mut self, settings: SyncSettings) -> Self {
        self.settings = settings;
        self
    }

    fn with_remote(mut self, remote: FakeSalesforce) -> Self {
        self.remote = Arc::new(remote);
        self
    }

    fn with_store(mut self, store: MemoryLocalStore) -> Self {
        self.store = Arc::new(store);
        self
    }

    fn with_mapped(mut self, mapped: MappedObject) -> Self {
        self.mapped = Arc::new(MemoryMappedObjectRepository::new().with(mapped));
        self
    }

    fn engine(&self) -> SyncEngine {
        SyncEngine::new(
            self.remote.clone(),
            self.store.clone(),
            self.mappings.clone(),
            self.mapped.clone(),
            self.queue.clone(),
            self.settings.clone(),
        )
        .with_event_sink(self.events.clone())
    }
}

fn contact_mapping() -> Mapping {
    Mapping::new("contact", "user", "user", "Contact")
        .with_field(FieldMapping::properties("mail", "Email", FieldDirection::Sync))
        .with_field(FieldMapping::properties("phone", "Phone", FieldDirection::Sync))
        .with_field(FieldMapping::properties("uuid", "Drupal_Id__c", FieldDirection::Push))
}

fn user() -> LocalRecord {
    let mut record = LocalRecord::new("user", "user")
        .with_id("7")
        .with_field("mail", json!("ada@example.com"))
        .unwrap()
        .with_field("uuid", json!("uuid-7"))
        .unwrap();
    record.updated_at = Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
    record
}

// ─────────────────────────────────────────────────────────────────────────────
// Push
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn push_creates_and_records_mapped_object() {
    let harness = Harness::new(vec![contact_mapping()]);
    let engine = harness.engine();

    let sfid = engine
        .push(&user(), &contact_mapping(), None)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(harness.remote.calls_starting_with("create:Contact").len(), 1);
    let params = harness.remote.last_params().unwrap();
    assert_eq!(params.get("Email"), Some(&json!("ada@example.com")));

    let rows = harness.mapped.all();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].sfid.as_ref(), Some(&sfid));
    assert_eq!(rows[0].last_sync_action, Some(SyncAction::PushCreate));
    assert!(rows[0].last_sync_status);
    assert_eq!(rows[0].entity_updated_at, user().updated_at);
}

#[tokio::test]
async fn push_updates_known_remote_record() {
    let existing = MappedObject::new("user", "7", "contact").with_sfid(sfid(3));
    let harness = Harness::new(vec![contact_mapping()]).with_mapped(existing.clone());

    harness
        .engine()
        .push(&user(), &contact_mapping(), Some(existing))
        .await
        .unwrap();

    assert_eq!(
        harness.remote.calls_starting_with("update:"),
        vec![format!("update:Contact:{}", sfid(3))]
    );
    assert!(harness.remote.calls_starting_with("create:").is_empty());
    assert_eq!(
        harness.mapped.all()[0].last_sync_action,
        Some(SyncAction::PushUpdate)
    );
}

#[tokio::test]
async fn upsert_key_takes_precedence_over_stored_sfid() {
    let mapping = contact_mapping().with_key("Drupal_Id__c");
    let existing = MappedObject::new("user", "7", "contact").with_sfid(sfid(3));
    let harness = Harness::new(vec![mapping.clone()])
        .with_remote(FakeSalesforce::new().with_external("Drupal_Id__c", "uuid-7", sfid(3)))
        .with_mapped(existing.clone());

    let pushed = harness
        .engine()
        .push(&user(), &mapping, Some(existing))
        .await
        .unwrap();

    assert_eq!(pushed, Some(sfid(3)));
    assert_eq!(
        harness.remote.calls_starting_with("upsert:"),
        vec!["upsert:Contact:Drupal_Id__c:uuid-7".to_string()]
    );
    assert!(harness.remote.calls_starting_with("update:").is_empty());
    assert_eq!(
        harness.mapped.all()[0].last_sync_action,
        Some(SyncAction::PushUpdate)
    );
}

#[tokio::test]
async fn upsert_that_creates_is_recorded_as_create() {
    let mapping = contact_mapping().with_key("Drupal_Id__c");
    let harness = Harness::new(vec![mapping.clone()]);

    harness.engine().push(&user(), &mapping, None).await.unwrap();

    assert_eq!(
        harness.mapped.all()[0].last_sync_action,
        Some(SyncAction::PushCreate)
    );
}

#[tokio::test]
async fn upsert_without_key_value_is_rejected() {
    let mapping = contact_mapping().with_key("Drupal_Id__c");
    let harness = Harness::new(vec![mapping.clone()]);
    let mut record = user();
    record.fields.remove("uuid");

    let err = harness.engine().push(&record, &mapping, None).await.unwrap_err();

    assert!(matches!(err, Error::InvalidRequest(_)));
    assert!(harness.remote.calls_starting_with("upsert:").is_empty());
}

#[tokio::test]
async fn failed_push_without_mapped_object_persists_nothing() {
    let harness = Harness::new(vec![contact_mapping()]);
    harness
        .remote
        .fail_next(Error::remote_api("REQUIRED_FIELD_MISSING", "Required fields are missing: [LastName]"));

    let err = harness
        .engine()
        .push(&user(), &contact_mapping(), None)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Required fields are missing: [LastName]");
    assert!(harness.mapped.all().is_empty());
    assert_eq!(harness.events.count(EventLevel::Error), 1);
}

#[tokio::test]
async fn failed_push_is_recorded_on_existing_mapped_object() {
    let existing = MappedObject::new("user", "7", "contact").with_sfid(sfid(3));
    let harness = Harness::new(vec![contact_mapping()]).with_mapped(existing.clone());
    harness
        .remote
        .fail_next(Error::remote_api("ENTITY_IS_DELETED", "entity is deleted"));

    assert!(harness
        .engine()
        .push(&user(), &contact_mapping(), Some(existing))
        .await
        .is_err());

    let row = &harness.mapped.all()[0];
    assert!(!row.last_sync_status);
    assert_eq!(row.last_sync_message.as_deref(), Some("entity is deleted"));
    assert_eq!(row.sfid, Some(sfid(3)));
}

struct StampHook;

impl PushParamsHook for StampHook {
    fn alter_push_params(
        &self,
        params: &mut PushParams,
        _record: &LocalRecord,
        mapping: &Mapping,
    ) -> crate::errors::Result<()> {
        params.insert("Source__c".to_string(), json!(mapping.id));
        params.remove("Phone");
        Ok(())
    }
}

#[tokio::test]
async fn push_params_hooks_can_rewrite_params() {
    let harness = Harness::new(vec![contact_mapping()]);
    let engine = harness.engine().with_push_params_hook(Arc::new(StampHook));

    let params = engine
        .build_push_params(&user(), &contact_mapping(), None)
        .await
        .unwrap();

    assert_eq!(params.get("Source__c"), Some(&json!("contact")));
    assert!(!params.contains_key("Phone"));
    assert_eq!(params.get("Drupal_Id__c"), Some(&json!("uuid-7")));
}

#[tokio::test]
async fn push_delete_removes_remote_and_mapped_object() {
    let existing = MappedObject::new("user", "7", "contact").with_sfid(sfid(3));
    let harness = Harness::new(vec![contact_mapping()]).with_mapped(existing.clone());

    harness
        .engine()
        .push_delete(existing, &contact_mapping())
        .await
        .unwrap();

    assert_eq!(
        harness.remote.calls_starting_with("delete:"),
        vec![format!("delete:Contact:{}", sfid(3))]
    );
    assert!(harness.mapped.all().is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Pull
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn pull_without_resolvable_remote_is_a_no_op() {
    let harness = Harness::new(vec![contact_mapping()]);

    let outcome = harness
        .engine()
        .pull(user(), &contact_mapping(), None)
        .await
        .unwrap();

    assert_eq!(outcome, PullOutcome::NoRemoteRecord);
    assert_eq!(harness.store.save_count(), 0);
    assert!(harness.mapped.all().is_empty());
    assert!(harness.remote.calls_starting_with("read").is_empty());
    assert_eq!(harness.events.count(EventLevel::Notice), 1);
}

#[tokio::test]
async fn pull_applies_present_fields_and_skips_missing_ones() {
    let existing = MappedObject::new("user", "7", "contact").with_sfid(sfid(3));
    let remote = FakeSalesforce::new().with_record(remote_record(json!({
        "Id": sfid(3).to_string(),
        "Email": "ada@lovelace.org",
        "Drupal_Id__c": "remote-uuid"
    })));
    let harness = Harness::new(vec![contact_mapping()])
        .with_remote(remote)
        .with_mapped(existing);
    let record = user().with_field("phone", json!("555-0100")).unwrap();

    let outcome = harness
        .engine()
        .pull(record, &contact_mapping(), None)
        .await
        .unwrap();

    assert!(matches!(outcome, PullOutcome::Applied { ref local_id, .. } if local_id == "7"));
    let saved = harness.store.record("user", "7").unwrap();
    assert_eq!(saved.get_str("mail"), Some("ada@lovelace.org"));
    assert_eq!(saved.get_str("phone"), Some("555-0100"));
    assert_eq!(saved.get_str("uuid"), Some("uuid-7"));

    let row = &harness.mapped.all()[0];
    assert_eq!(row.last_sync_action, Some(SyncAction::Pull));
    assert!(row.last_sync_status);
}

#[tokio::test]
async fn failed_pull_is_recorded_on_existing_mapped_object() {
    let mut existing = MappedObject::new("user", "7", "contact").with_sfid(sfid(3));
    existing.mark_success(SyncAction::PushCreate);
    let remote = FakeSalesforce::new().with_record(remote_record(json!({
        "Id": sfid(3).to_string(),
        "Email": "ada@lovelace.org"
    })));
    let harness = Harness::new(vec![contact_mapping()])
        .with_remote(remote)
        .with_mapped(existing);
    harness.store.fail_saves();

    let err = harness
        .engine()
        .pull(user(), &contact_mapping(), None)
        .await
        .unwrap_err();

    let row = &harness.mapped.all()[0];
    assert_eq!(row.last_sync_action, Some(SyncAction::Pull));
    assert!(!row.last_sync_status);
    assert_eq!(row.last_sync_message.as_deref(), Some(err.to_string().as_str()));
    assert_eq!(row.sfid, Some(sfid(3)));
    assert_eq!(harness.events.count(EventLevel::Error), 1);
}

#[tokio::test]
async fn unwritable_field_is_skipped_and_later_fields_still_apply() {
    let mapping = Mapping::new("contact", "user", "user", "Contact")
        .with_field(FieldMapping::properties("title.sub", "Title", FieldDirection::Sync))
        .with_field(FieldMapping::properties("mail", "Email", FieldDirection::Sync));
    let existing = MappedObject::new("user", "7", "contact").with_sfid(sfid(3));
    let remote = FakeSalesforce::new().with_record(remote_record(json!({
        "Id": sfid(3).to_string(),
        "Title": "Countess",
        "Email": "ada@lovelace.org"
    })));
    let harness = Harness::new(vec![mapping.clone()])
        .with_remote(remote)
        .with_mapped(existing);
    let record = user().with_field("title", json!("x")).unwrap();

    harness.engine().pull(record, &mapping, None).await.unwrap();

    let saved = harness.store.record("user", "7").unwrap();
    assert_eq!(saved.get_str("title"), Some("x"));
    assert_eq!(saved.get_str("mail"), Some("ada@lovelace.org"));
    assert_eq!(harness.events.count(EventLevel::Warning), 1);
    assert!(harness.mapped.all()[0].last_sync_status);
}

#[tokio::test]
async fn failed_plugin_lookup_is_skipped_and_later_fields_still_apply() {
    let mapping = Mapping::new("contact", "user", "user", "Contact")
        .with_field(FieldMapping::new(
            FieldPluginKind::RelatedTermString {
                vocabulary: "tiers".to_string(),
            },
            "tier",
            "Tier__c",
            FieldDirection::Sync,
        ))
        .with_field(FieldMapping::properties("mail", "Email", FieldDirection::Sync));
    let existing = MappedObject::new("user", "7", "contact").with_sfid(sfid(3));
    let remote = FakeSalesforce::new().with_record(remote_record(json!({
        "Id": sfid(3).to_string(),
        "Tier__c": "Gold",
        "Email": "ada@lovelace.org"
    })));
    let harness = Harness::new(vec![mapping.clone()])
        .with_remote(remote)
        .with_mapped(existing);
    harness.store.fail_term_lookups();

    harness.engine().pull(user(), &mapping, None).await.unwrap();

    let saved = harness.store.record("user", "7").unwrap();
    assert!(saved.get("tier").is_none());
    assert_eq!(saved.get_str("mail"), Some("ada@lovelace.org"));
    let warnings = harness.events.events();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message().contains("term index unavailable"));
}

#[tokio::test]
async fn pull_resolves_remote_by_upsert_key() {
    let mapping = Mapping::new("contact", "user", "user", "Contact")
        .with_field(FieldMapping::properties("mail", "Email", FieldDirection::Sync))
        .with_field(FieldMapping::properties("uuid", "Drupal_Id__c", FieldDirection::Push))
        .with_key("Drupal_Id__c");
    let remote = FakeSalesforce::new()
        .with_external("Drupal_Id__c", "uuid-7", sfid(5))
        .with_record(remote_record(json!({
            "Id": sfid(5).to_string(),
            "Email": "ada@lovelace.org"
        })));
    let harness = Harness::new(vec![mapping.clone()]).with_remote(remote);

    let outcome = harness.engine().pull(user(), &mapping, None).await.unwrap();

    let PullOutcome::Applied { mapped_object, .. } = outcome else {
        panic!("expected the pull to apply");
    };
    assert_eq!(mapped_object.sfid, Some(sfid(5)));
    assert_eq!(
        harness.remote.calls_starting_with("read_external:"),
        vec!["read_external:Contact:Drupal_Id__c:uuid-7".to_string()]
    );
}

#[tokio::test]
async fn pull_query_is_bounded_and_ordered_by_trigger_date() {
    let mut mapping = contact_mapping();
    mapping.pull_where_clause = Some("IsDeleted = false".to_string());
    let harness = Harness::new(vec![mapping.clone()]);
    let since = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();

    let query = harness
        .engine()
        .build_pull_query(&mapping, Some(since))
        .unwrap();

    assert_eq!(
        query.soql(),
        "SELECT Id,Email,Phone,LastModifiedDate FROM Contact \
         WHERE LastModifiedDate > 2024-03-01T08:00:00Z AND (IsDeleted = false) \
         ORDER BY LastModifiedDate ASC LIMIT 2000"
    );
}

#[tokio::test]
async fn pull_batch_creates_records_and_advances_watermark() {
    let page = QueryResult {
        total_size: 2,
        done: true,
        records: vec![
            remote_record(json!({
                "Id": sfid(1).to_string(),
                "Email": "one@example.com",
                "LastModifiedDate": "2024-03-01T10:00:00.000+0000"
            })),
            remote_record(json!({
                "Id": sfid(2).to_string(),
                "Email": "two@example.com",
                "LastModifiedDate": "2024-03-01T11:00:00.000+0000"
            })),
        ],
        next_records_url: None,
    };
    let harness =
        Harness::new(vec![contact_mapping()]).with_remote(FakeSalesforce::new().with_page(page));

    let summary = harness.engine().run_pull_batch().await.unwrap();

    assert_eq!(summary.mappings, 1);
    assert_eq!(summary.created, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(harness.store.record_count(), 2);
    assert_eq!(harness.mapped.all().len(), 2);
    let state = harness.mappings.pull_state("contact").unwrap();
    assert_eq!(
        state.last_pull_at,
        Some(Utc.with_ymd_and_hms(2024, 3, 1, 11, 0, 0).unwrap())
    );
    assert!(state.last_delete_check_at.is_some());
}

fn contact_at(n: u32, email: &str, modified: &str) -> crate::remote::RemoteRecord {
    remote_record(json!({
        "Id": sfid(n).to_string(),
        "Email": email,
        "LastModifiedDate": modified
    }))
}

fn page_of(records: Vec<crate::remote::RemoteRecord>) -> QueryResult {
    QueryResult {
        total_size: records.len() as u64,
        done: true,
        records,
        next_records_url: None,
    }
}

#[tokio::test]
async fn failure_within_a_shared_trigger_date_keeps_that_date_for_the_next_run() {
    let first_run = page_of(vec![
        contact_at(1, "one@example.com", "2024-03-01T09:00:00.000+0000"),
        contact_at(2, "two@example.com", "2024-03-01T10:00:00.000+0000"),
        contact_at(3, "bad@example.com", "2024-03-01T10:00:00.000+0000"),
    ]);
    let second_run = page_of(vec![
        contact_at(2, "two@example.com", "2024-03-01T10:00:00.000+0000"),
        contact_at(3, "bad@example.com", "2024-03-01T10:00:00.000+0000"),
    ]);
    let harness = Harness::new(vec![contact_mapping()]).with_remote(
        FakeSalesforce::new()
            .with_page(first_run)
            .with_page(second_run),
    );
    harness
        .store
        .reject_saves_with("mail", json!("bad@example.com"));
    let engine = harness.engine();

    let summary = engine.run_pull_batch().await.unwrap();

    assert_eq!(summary.created, 2);
    assert_eq!(summary.failed, 1);
    let state = harness.mappings.pull_state("contact").unwrap();
    assert_eq!(
        state.last_pull_at,
        Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap())
    );

    let summary = engine.run_pull_batch().await.unwrap();

    let queries = harness.remote.calls_starting_with("query:");
    assert_eq!(queries.len(), 2);
    assert!(queries[1].contains("LastModifiedDate > 2024-03-01T09:00:00Z"));
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(
        harness.mappings.pull_state("contact").unwrap().last_pull_at,
        Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap())
    );
}

#[tokio::test]
async fn truncated_run_does_not_commit_its_last_trigger_date() {
    let page = page_of(vec![
        contact_at(1, "one@example.com", "2024-03-01T10:00:00.000+0000"),
        contact_at(2, "two@example.com", "2024-03-01T11:00:00.000+0000"),
    ]);
    let settings = SyncSettings {
        pull_max_records: 2,
        ..SyncSettings::default()
    };
    let harness = Harness::new(vec![contact_mapping()])
        .with_remote(FakeSalesforce::new().with_page(page))
        .with_settings(settings);

    let summary = harness.engine().run_pull_batch().await.unwrap();

    assert_eq!(summary.created, 2);
    assert_eq!(
        harness.mappings.pull_state("contact").unwrap().last_pull_at,
        Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap())
    );
}

#[tokio::test]
async fn record_whose_last_pull_failed_is_pulled_again() {
    let mut failed = MappedObject::new("user", "7", "contact").with_sfid(sfid(3));
    failed.mark_failure(SyncAction::Pull, "save rejected");
    let page = page_of(vec![contact_at(
        3,
        "ada@lovelace.org",
        "2024-03-01T10:00:00.000+0000",
    )]);
    let harness = Harness::new(vec![contact_mapping()])
        .with_remote(FakeSalesforce::new().with_page(page))
        .with_store(MemoryLocalStore::new().with_record(user()))
        .with_mapped(failed);

    let summary = harness.engine().run_pull_batch().await.unwrap();

    assert_eq!(summary.updated, 1);
    assert_eq!(
        harness.store.record("user", "7").unwrap().get_str("mail"),
        Some("ada@lovelace.org")
    );
    assert!(harness.mapped.all()[0].last_sync_status);
}

#[tokio::test]
async fn pull_batch_removes_records_deleted_remotely() {
    let mut mapping = contact_mapping();
    mapping.sync_triggers = SyncTriggers {
        pull_delete: true,
        ..SyncTriggers::default()
    };
    let harness = Harness::new(vec![mapping])
        .with_remote(FakeSalesforce::new().with_deleted(sfid(3)))
        .with_store(MemoryLocalStore::new().with_record(user()))
        .with_mapped(MappedObject::new("user", "7", "contact").with_sfid(sfid(3)));

    let summary = harness.engine().run_pull_batch().await.unwrap();

    assert_eq!(summary.deleted, 1);
    assert!(harness.store.record("user", "7").is_none());
    assert!(harness.mapped.all().is_empty());
    assert!(harness.remote.calls_starting_with("query:").is_empty());
}

#[tokio::test]
async fn pull_batch_aborts_on_auth_failure() {
    let harness = Harness::new(vec![contact_mapping()]);
    harness
        .remote
        .fail_next(Error::AuthExpired("INVALID_SESSION_ID".to_string()));

    let err = harness.engine().run_pull_batch().await.unwrap_err();

    assert!(err.is_auth_failure());
    assert!(harness.remote.calls_starting_with("get_deleted:").is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Local events
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn async_mappings_enqueue_instead_of_pushing() {
    let mut mapping = contact_mapping();
    mapping.async_push = true;
    let harness = Harness::new(vec![mapping]);

    harness
        .engine()
        .on_local_event(&user(), QueueOp::Create)
        .await
        .unwrap();

    let items = harness.queue.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].op, QueueOp::Create);
    assert!(harness.remote.calls_starting_with("create:").is_empty());
}

#[tokio::test]
async fn failed_inline_push_is_queued_for_retry() {
    let harness = Harness::new(vec![contact_mapping()]);
    harness
        .remote
        .fail_next(Error::RemoteTransport("connection reset".to_string()));

    harness
        .engine()
        .on_local_event(&user(), QueueOp::Update)
        .await
        .unwrap();

    let items = harness.queue.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].local_id, "7");
    assert_eq!(items[0].op, QueueOp::Update);
}

#[tokio::test]
async fn disabled_trigger_skips_the_mapping() {
    let mut mapping = contact_mapping();
    mapping.sync_triggers.push_update = false;
    let harness = Harness::new(vec![mapping]);

    harness
        .engine()
        .on_local_event(&user(), QueueOp::Update)
        .await
        .unwrap();

    assert!(harness.remote.calls().is_empty());
    assert!(harness.queue.items().is_empty());
}

#[tokio::test]
async fn local_delete_cascades_to_remote_and_mapped_objects() {
    let harness = Harness::new(vec![contact_mapping()])
        .with_mapped(MappedObject::new("user", "7", "contact").with_sfid(sfid(3)));

    harness
        .engine()
        .on_local_event(&user(), QueueOp::Delete)
        .await
        .unwrap();

    assert_eq!(harness.remote.calls_starting_with("delete:").len(), 1);
    assert!(harness.mapped.all().is_empty());
    assert!(harness.queue.items().is_empty());
}
