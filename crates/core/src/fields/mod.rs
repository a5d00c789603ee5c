//! Field mapping plugins.
//!
//! Each configured [`FieldMapping`] is backed by one plugin that knows how to
//! read a push value from a local record and how to turn a remote value into
//! something the local field accepts. Type coercion shared by every plugin
//! lives in [`coercion`].

pub mod coercion;
mod plugins;

use async_trait::async_trait;
use serde_json::Value;

pub use coercion::{coerce_pull, coerce_push};
pub use plugins::{
    ConstantPlugin, PropertiesPlugin, RecordSfidPlugin, RelatedIdsPlugin,
    RelatedTermStringPlugin, TokenPlugin,
};

use crate::errors::{Error, Result};
use crate::events::{SyncEvent, SyncEventSink};
use crate::local::{LocalRecord, LocalStore};
use crate::mapped_object::{MappedObject, MappedObjectRepositoryTrait};
use crate::mapping::{FieldMapping, FieldPluginKind, Mapping};
use crate::remote::{ObjectMetadata, RemoteRecord};

/// Collaborators a plugin may consult while resolving a value.
pub struct PluginContext<'a> {
    pub mapped_objects: &'a dyn MappedObjectRepositoryTrait,
    pub local_store: &'a dyn LocalStore,
    pub events: &'a dyn SyncEventSink,
    /// Describe of the mapping's remote object, if it could be loaded.
    pub metadata: Option<&'a ObjectMetadata>,
    /// Mapped object of the record being synced, if one exists.
    pub mapped_object: Option<&'a MappedObject>,
}

#[async_trait]
pub trait FieldMappingPlugin: Send + Sync {
    fn config(&self) -> &FieldMapping;

    /// Whether this field takes part in push.
    fn push(&self) -> bool {
        self.config().direction.pushes()
    }

    /// Whether this field takes part in pull.
    fn pull(&self) -> bool {
        self.config().direction.pulls()
    }

    /// Raw push value read from the local record, before coercion.
    async fn value(
        &self,
        record: &LocalRecord,
        mapping: &Mapping,
        ctx: &PluginContext<'_>,
    ) -> Result<Value>;

    /// Value to write onto the local field. Fails with `NoDataToPull` when the
    /// plugin does not pull or the remote record has nothing for it.
    async fn pull_value(
        &self,
        remote: &RemoteRecord,
        record: &LocalRecord,
        mapping: &Mapping,
        ctx: &PluginContext<'_>,
    ) -> Result<Value>;
}

pub fn build_plugin(config: &FieldMapping) -> Box<dyn FieldMappingPlugin> {
    let config = config.clone();
    match &config.plugin {
        FieldPluginKind::Properties => Box::new(PropertiesPlugin::new(config)),
        FieldPluginKind::Constant { .. } => Box::new(ConstantPlugin::new(config)),
        FieldPluginKind::RelatedIds { .. } => Box::new(RelatedIdsPlugin::new(config)),
        FieldPluginKind::RelatedTermString { .. } => Box::new(RelatedTermStringPlugin::new(config)),
        FieldPluginKind::Token { .. } => Box::new(TokenPlugin::new(config)),
        FieldPluginKind::RecordSfid => Box::new(RecordSfidPlugin::new(config)),
    }
}

/// `value()` followed by coercion to the remote field's type.
///
/// A field missing from the describe is sent unconverted with a warning.
pub async fn push_value(
    plugin: &dyn FieldMappingPlugin,
    record: &LocalRecord,
    mapping: &Mapping,
    ctx: &PluginContext<'_>,
) -> Result<Value> {
    let raw = plugin.value(record, mapping, ctx).await?;
    let Some(metadata) = ctx.metadata else {
        return Ok(raw);
    };

    let salesforce_field = &plugin.config().salesforce_field;
    match metadata.field(salesforce_field) {
        Ok(describe) => coerce_push(raw, describe),
        Err(err) => {
            ctx.events.report(
                SyncEvent::warning(
                    "Pushing {field} on mapping {mapping} without type conversion: {message}",
                )
                .with("field", salesforce_field)
                .with("mapping", &mapping.id)
                .with("message", &err),
            );
            Ok(raw)
        }
    }
}

/// Shared pull preamble: checks the capability and remote binding, then reads
/// and coerces the remote value for the plugin's local field.
pub(crate) fn base_pull_value(
    plugin: &dyn FieldMappingPlugin,
    remote: &RemoteRecord,
    record: &LocalRecord,
    ctx: &PluginContext<'_>,
) -> Result<Value> {
    let config = plugin.config();
    let salesforce_field = config.salesforce_field.trim();
    if !plugin.pull() || salesforce_field.is_empty() {
        return Err(Error::NoDataToPull(config.local_field.clone()));
    }

    let raw = remote
        .get(salesforce_field)
        .cloned()
        .ok_or_else(|| Error::NoDataToPull(salesforce_field.to_string()))?;

    let Some(describe) = ctx.metadata.and_then(|m| m.field(salesforce_field).ok()) else {
        return Ok(raw);
    };
    let local_definition =
        ctx.local_store
            .field_definition(&record.entity_type, &record.bundle, &config.local_field);
    coerce_pull(raw, &describe.field_type, local_definition.as_ref())
}

/// Local ids held by a reference field: a scalar, an array, or objects with `id`.
pub(crate) fn reference_ids(value: Option<&Value>) -> Vec<String> {
    fn one(value: &Value) -> Option<String> {
        match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Object(map) => map.get("id").and_then(one),
            _ => None,
        }
    }

    match value {
        Some(Value::Array(items)) => items.iter().filter_map(one).collect(),
        Some(other) => one(other).into_iter().collect(),
        None => Vec::new(),
    }
}
