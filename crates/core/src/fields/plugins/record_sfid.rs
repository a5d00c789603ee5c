use async_trait::async_trait;
use serde_json::Value;

use crate::errors::{Error, Result};
use crate::fields::{FieldMappingPlugin, PluginContext};
use crate::local::LocalRecord;
use crate::mapping::{FieldMapping, Mapping};
use crate::remote::RemoteRecord;

/// Copies the remote record id onto a local field. Never pushes.
pub struct RecordSfidPlugin {
    config: FieldMapping,
}

impl RecordSfidPlugin {
    pub fn new(config: FieldMapping) -> Self {
        Self { config }
    }
}

#[async_trait]
impl FieldMappingPlugin for RecordSfidPlugin {
    fn config(&self) -> &FieldMapping {
        &self.config
    }

    fn push(&self) -> bool {
        false
    }

    async fn value(
        &self,
        _record: &LocalRecord,
        _mapping: &Mapping,
        ctx: &PluginContext<'_>,
    ) -> Result<Value> {
        Ok(ctx
            .mapped_object
            .and_then(|m| m.sfid.as_ref())
            .map(|sfid| Value::String(sfid.to_string()))
            .unwrap_or(Value::Null))
    }

    async fn pull_value(
        &self,
        remote: &RemoteRecord,
        _record: &LocalRecord,
        _mapping: &Mapping,
        _ctx: &PluginContext<'_>,
    ) -> Result<Value> {
        if !self.pull() {
            return Err(Error::NoDataToPull(self.config.local_field.clone()));
        }
        remote
            .id()
            .map(|sfid| Value::String(sfid.to_string()))
            .ok_or_else(|| Error::NoDataToPull("Id".to_string()))
    }
}
