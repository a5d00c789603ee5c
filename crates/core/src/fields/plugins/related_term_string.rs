use async_trait::async_trait;
use serde_json::Value;

use crate::errors::Result;
use crate::fields::{base_pull_value, reference_ids, FieldMappingPlugin, PluginContext};
use crate::local::LocalRecord;
use crate::mapping::{FieldMapping, FieldPluginKind, Mapping};
use crate::remote::RemoteRecord;

/// Pushes a term reference as the term's name; on pull, resolves the name to
/// a term id, creating the term when it does not exist.
pub struct RelatedTermStringPlugin {
    config: FieldMapping,
}

impl RelatedTermStringPlugin {
    pub fn new(config: FieldMapping) -> Self {
        Self { config }
    }

    fn vocabulary(&self) -> &str {
        match &self.config.plugin {
            FieldPluginKind::RelatedTermString { vocabulary } => vocabulary,
            _ => "",
        }
    }

    async fn term_id(&self, name: &str, ctx: &PluginContext<'_>) -> Result<Option<Value>> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }
        let id = ctx
            .local_store
            .find_or_create_term(self.vocabulary(), name)
            .await?;
        Ok(Some(Value::String(id)))
    }
}

#[async_trait]
impl FieldMappingPlugin for RelatedTermStringPlugin {
    fn config(&self) -> &FieldMapping {
        &self.config
    }

    async fn value(
        &self,
        record: &LocalRecord,
        _mapping: &Mapping,
        ctx: &PluginContext<'_>,
    ) -> Result<Value> {
        let mut names = Vec::new();
        for term_id in reference_ids(record.get(&self.config.local_field)) {
            if let Some(name) = ctx.local_store.term_name(self.vocabulary(), &term_id).await? {
                names.push(Value::String(name));
            }
        }
        Ok(match names.len() {
            0 => Value::Null,
            1 => names.remove(0),
            _ => Value::Array(names),
        })
    }

    async fn pull_value(
        &self,
        remote: &RemoteRecord,
        record: &LocalRecord,
        _mapping: &Mapping,
        ctx: &PluginContext<'_>,
    ) -> Result<Value> {
        match base_pull_value(self, remote, record, ctx)? {
            Value::String(name) => Ok(self.term_id(&name, ctx).await?.unwrap_or(Value::Null)),
            Value::Array(items) => {
                let mut ids = Vec::new();
                for name in items.iter().filter_map(Value::as_str) {
                    if let Some(id) = self.term_id(name, ctx).await? {
                        ids.push(id);
                    }
                }
                Ok(Value::Array(ids))
            }
            _ => Ok(Value::Null),
        }
    }
}
