use async_trait::async_trait;
use serde_json::Value;

use crate::errors::{Error, Result};
use crate::fields::{FieldMappingPlugin, PluginContext};
use crate::local::LocalRecord;
use crate::mapping::{FieldMapping, FieldPluginKind, Mapping};
use crate::remote::RemoteRecord;

/// Pushes a fixed value. Never pulls.
pub struct ConstantPlugin {
    config: FieldMapping,
}

impl ConstantPlugin {
    pub fn new(config: FieldMapping) -> Self {
        Self { config }
    }
}

#[async_trait]
impl FieldMappingPlugin for ConstantPlugin {
    fn config(&self) -> &FieldMapping {
        &self.config
    }

    fn pull(&self) -> bool {
        false
    }

    async fn value(
        &self,
        _record: &LocalRecord,
        _mapping: &Mapping,
        _ctx: &PluginContext<'_>,
    ) -> Result<Value> {
        match &self.config.plugin {
            FieldPluginKind::Constant { value } => Ok(Value::String(value.clone())),
            _ => Ok(Value::Null),
        }
    }

    async fn pull_value(
        &self,
        _remote: &RemoteRecord,
        _record: &LocalRecord,
        _mapping: &Mapping,
        _ctx: &PluginContext<'_>,
    ) -> Result<Value> {
        Err(Error::NoDataToPull(self.config.salesforce_field.clone()))
    }
}
