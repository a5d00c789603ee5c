use async_trait::async_trait;
use serde_json::Value;

use crate::errors::{Error, Result};
use crate::fields::{FieldMappingPlugin, PluginContext};
use crate::local::LocalRecord;
use crate::mapping::{FieldMapping, FieldPluginKind, Mapping};
use crate::remote::RemoteRecord;

/// Expands `[selector]` tokens from the local record. Never pulls.
///
/// `[id]`, `[entity_type]` and `[bundle]` resolve to the record's own
/// identity; any other token is read as a field selector. Unknown tokens
/// expand to an empty string.
pub struct TokenPlugin {
    config: FieldMapping,
}

impl TokenPlugin {
    pub fn new(config: FieldMapping) -> Self {
        Self { config }
    }

    fn template(&self) -> &str {
        match &self.config.plugin {
            FieldPluginKind::Token { template } => template,
            _ => "",
        }
    }
}

fn resolve_token(record: &LocalRecord, token: &str) -> String {
    match token {
        "id" => record.id_str().to_string(),
        "entity_type" => record.entity_type.clone(),
        "bundle" => record.bundle.clone(),
        selector => match record.get(selector) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        },
    }
}

pub(crate) fn expand_tokens(template: &str, record: &LocalRecord) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('[') {
        output.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find(']') {
            Some(end) => {
                output.push_str(&resolve_token(record, after[..end].trim()));
                rest = &after[end + 1..];
            }
            None => {
                output.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    output.push_str(rest);
    output
}

#[async_trait]
impl FieldMappingPlugin for TokenPlugin {
    fn config(&self) -> &FieldMapping {
        &self.config
    }

    fn pull(&self) -> bool {
        false
    }

    async fn value(
        &self,
        record: &LocalRecord,
        _mapping: &Mapping,
        _ctx: &PluginContext<'_>,
    ) -> Result<Value> {
        Ok(Value::String(expand_tokens(self.template(), record)))
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
