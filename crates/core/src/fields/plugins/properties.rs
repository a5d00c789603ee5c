use async_trait::async_trait;
use serde_json::Value;

use crate::errors::Result;
use crate::fields::{base_pull_value, FieldMappingPlugin, PluginContext};
use crate::local::LocalRecord;
use crate::mapping::{FieldMapping, Mapping};
use crate::remote::RemoteRecord;

/// Reads and writes a local field selector as-is.
pub struct PropertiesPlugin {
    config: FieldMapping,
}

impl PropertiesPlugin {
    pub fn new(config: FieldMapping) -> Self {
        Self { config }
    }
}

#[async_trait]
impl FieldMappingPlugin for PropertiesPlugin {
    fn config(&self) -> &FieldMapping {
        &self.config
    }

    async fn value(
        &self,
        record: &LocalRecord,
        _mapping: &Mapping,
        _ctx: &PluginContext<'_>,
    ) -> Result<Value> {
        Ok(record
            .get(&self.config.local_field)
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn pull_value(
        &self,
        remote: &RemoteRecord,
        record: &LocalRecord,
        _mapping: &Mapping,
        ctx: &PluginContext<'_>,
    ) -> Result<Value> {
        base_pull_value(self, remote, record, ctx)
    }
}
