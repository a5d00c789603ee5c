use async_trait::async_trait;
use serde_json::Value;

use crate::errors::{Error, Result};
use crate::fields::{base_pull_value, reference_ids, FieldMappingPlugin, PluginContext};
use crate::local::LocalRecord;
use crate::mapping::{FieldMapping, FieldPluginKind, Mapping};
use crate::remote::RemoteRecord;
use crate::sfid::Sfid;

/// Translates a local entity reference into the referenced record's remote
/// id, and back, through the mapped object index.
pub struct RelatedIdsPlugin {
    config: FieldMapping,
}

impl RelatedIdsPlugin {
    pub fn new(config: FieldMapping) -> Self {
        Self { config }
    }

    fn target_entity_type(&self) -> &str {
        match &self.config.plugin {
            FieldPluginKind::RelatedIds { target_entity_type } => target_entity_type,
            _ => "",
        }
    }
}

#[async_trait]
impl FieldMappingPlugin for RelatedIdsPlugin {
    fn config(&self) -> &FieldMapping {
        &self.config
    }

    /// Remote id of the first referenced entity that has been synced, or null.
    async fn value(
        &self,
        record: &LocalRecord,
        _mapping: &Mapping,
        ctx: &PluginContext<'_>,
    ) -> Result<Value> {
        let target = self.target_entity_type();
        for local_id in reference_ids(record.get(&self.config.local_field)) {
            let mapped = ctx.mapped_objects.find_all_for_local(target, &local_id)?;
            if let Some(sfid) = mapped.into_iter().find_map(|m| m.sfid) {
                return Ok(Value::String(sfid.to_string()));
            }
        }
        Ok(Value::Null)
    }

    async fn pull_value(
        &self,
        remote: &RemoteRecord,
        record: &LocalRecord,
        _mapping: &Mapping,
        ctx: &PluginContext<'_>,
    ) -> Result<Value> {
        let value = base_pull_value(self, remote, record, ctx)?;
        let raw = match &value {
            Value::Null => return Ok(Value::Null),
            Value::String(s) => s.as_str(),
            other => return Err(Error::InvalidIdentifier(other.to_string())),
        };

        let sfid = Sfid::new(raw)?;
        let target = self.target_entity_type();
        ctx.mapped_objects
            .find_by_sfid(&sfid)?
            .into_iter()
            .find(|m| m.entity_type == target)
            .map(|m| Value::String(m.local_id))
            .ok_or_else(|| Error::MappedObjectNotFound(format!("{} for {}", target, sfid)))
    }
}
