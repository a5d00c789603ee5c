//! Mapping configuration between a local entity type and a Salesforce object.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::queue::QueueOp;

pub const DEFAULT_PULL_TRIGGER_DATE: &str = "LastModifiedDate";

/// Which way a field mapping moves data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldDirection {
    /// Local to remote only.
    Push,
    /// Remote to local only.
    Pull,
    #[default]
    Sync,
}

impl FieldDirection {
    pub fn pushes(self) -> bool {
        matches!(self, FieldDirection::Push | FieldDirection::Sync)
    }

    pub fn pulls(self) -> bool {
        matches!(self, FieldDirection::Pull | FieldDirection::Sync)
    }
}

/// Plugin variant and its configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "plugin", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum FieldPluginKind {
    /// Direct read/write of `local_field`.
    Properties,
    /// A literal value, push only.
    Constant { value: String },
    /// Local reference id(s) to the remote ids of their mapped objects.
    RelatedIds { target_entity_type: String },
    /// Local term reference to/from the term's name.
    RelatedTermString { vocabulary: String },
    /// `[field]` tokens expanded from the local record, push only.
    Token { template: String },
    /// The mapped object's remote id.
    RecordSfid,
}

impl FieldPluginKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldPluginKind::Properties => "properties",
            FieldPluginKind::Constant { .. } => "constant",
            FieldPluginKind::RelatedIds { .. } => "related_ids",
            FieldPluginKind::RelatedTermString { .. } => "related_term_string",
            FieldPluginKind::Token { .. } => "token",
            FieldPluginKind::RecordSfid => "record_sfid",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    #[serde(flatten)]
    pub plugin: FieldPluginKind,
    /// Local field selector. Unused by `constant` and `token`.
    #[serde(default)]
    pub local_field: String,
    pub salesforce_field: String,
    #[serde(default)]
    pub direction: FieldDirection,
}

impl FieldMapping {
    pub fn properties(local_field: &str, salesforce_field: &str, direction: FieldDirection) -> Self {
        Self {
            plugin: FieldPluginKind::Properties,
            local_field: local_field.to_string(),
            salesforce_field: salesforce_field.to_string(),
            direction,
        }
    }

    pub fn new(
        plugin: FieldPluginKind,
        local_field: &str,
        salesforce_field: &str,
        direction: FieldDirection,
    ) -> Self {
        Self {
            plugin,
            local_field: local_field.to_string(),
            salesforce_field: salesforce_field.to_string(),
            direction,
        }
    }
}

/// Local and remote CRUD events that fire a push or pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncTriggers {
    pub push_create: bool,
    pub push_update: bool,
    pub push_delete: bool,
    pub pull_create: bool,
    pub pull_update: bool,
    pub pull_delete: bool,
}

impl SyncTriggers {
    pub fn all() -> Self {
        Self {
            push_create: true,
            push_update: true,
            push_delete: true,
            pull_create: true,
            pull_update: true,
            pull_delete: true,
        }
    }

    pub fn allows_push(&self, op: QueueOp) -> bool {
        match op {
            QueueOp::Create => self.push_create,
            QueueOp::Update => self.push_update,
            QueueOp::Delete => self.push_delete,
        }
    }

    pub fn has_pull(&self) -> bool {
        self.pull_create || self.pull_update || self.pull_delete
    }
}

fn default_pull_trigger_date() -> String {
    DEFAULT_PULL_TRIGGER_DATE.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mapping {
    pub id: String,
    #[serde(default)]
    pub label: String,
    pub local_entity_type: String,
    pub local_bundle: String,
    pub salesforce_object: String,
    #[serde(default)]
    pub field_mappings: Vec<FieldMapping>,
    /// Upsert key: a remote external-id field.
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default = "default_pull_trigger_date")]
    pub pull_trigger_date: String,
    #[serde(default)]
    pub sync_triggers: SyncTriggers,
    /// Queue pushes instead of sending them inline.
    #[serde(default)]
    pub async_push: bool,
    /// Retry ceiling for queued pushes; 0 retries forever.
    #[serde(default)]
    pub push_retries: u32,
    /// Extra SOQL condition appended to pull queries.
    #[serde(default)]
    pub pull_where_clause: Option<String>,
    #[serde(default)]
    pub weight: i32,
}

impl Mapping {
    pub fn new(id: &str, local_entity_type: &str, local_bundle: &str, salesforce_object: &str) -> Self {
        Self {
            id: id.to_string(),
            label: id.to_string(),
            local_entity_type: local_entity_type.to_string(),
            local_bundle: local_bundle.to_string(),
            salesforce_object: salesforce_object.to_string(),
            field_mappings: Vec::new(),
            key: None,
            pull_trigger_date: default_pull_trigger_date(),
            sync_triggers: SyncTriggers::all(),
            async_push: false,
            push_retries: 0,
            pull_where_clause: None,
            weight: 0,
        }
    }

    pub fn with_field(mut self, field: FieldMapping) -> Self {
        self.field_mappings.push(field);
        self
    }

    pub fn with_key(mut self, key: &str) -> Self {
        self.key = Some(key.to_string());
        self
    }

    /// The upsert key, ignoring blank values.
    pub fn upsert_key(&self) -> Option<&str> {
        self.key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    /// The field mapping that supplies the upsert key's value.
    pub fn key_field_mapping(&self) -> Option<&FieldMapping> {
        let key = self.upsert_key()?;
        self.field_mappings
            .iter()
            .find(|f| f.salesforce_field.eq_ignore_ascii_case(key))
    }

    pub fn matches(&self, entity_type: &str, bundle: &str) -> bool {
        self.local_entity_type == entity_type && self.local_bundle == bundle
    }

    /// Check the configuration invariants.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::InvalidMapping("Mapping id is required".to_string()));
        }
        if self.salesforce_object.trim().is_empty() {
            return Err(Error::InvalidMapping(format!(
                "Mapping '{}' has no Salesforce object",
                self.id
            )));
        }
        if self.local_entity_type.trim().is_empty() {
            return Err(Error::InvalidMapping(format!(
                "Mapping '{}' has no local entity type",
                self.id
            )));
        }
        if let Some(field) = self
            .field_mappings
            .iter()
            .find(|f| f.salesforce_field.trim().is_empty())
        {
            return Err(Error::InvalidMapping(format!(
                "Mapping '{}' has a {} field without a Salesforce field",
                self.id,
                field.plugin.name()
            )));
        }
        if let Some(key) = self.upsert_key() {
            let count = self
                .field_mappings
                .iter()
                .filter(|f| f.salesforce_field.eq_ignore_ascii_case(key))
                .count();
            if count != 1 {
                return Err(Error::InvalidMapping(format!(
                    "Upsert key '{}' of mapping '{}' must match exactly one field mapping (found {})",
                    key, self.id, count
                )));
            }
        }
        Ok(())
    }
}

/// Pull watermark per mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullState {
    pub mapping_id: String,
    /// Trigger-date value of the last record pulled successfully.
    pub last_pull_at: Option<DateTime<Utc>>,
    /// End of the last processed deleted-records window.
    pub last_delete_check_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl PullState {
    pub fn new(mapping_id: &str) -> Self {
        Self {
            mapping_id: mapping_id.to_string(),
            last_pull_at: None,
            last_delete_check_at: None,
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn contact_mapping() -> Mapping {
        Mapping::new("contact", "user", "user", "Contact")
            .with_field(FieldMapping::properties("mail", "Email", FieldDirection::Sync))
            .with_field(FieldMapping::properties("uuid", "Drupal_Id__c", FieldDirection::Push))
    }

    #[test]
    fn upsert_key_must_match_one_field() {
        assert!(contact_mapping().with_key("Drupal_Id__c").validate().is_ok());
        assert!(matches!(
            contact_mapping().with_key("Missing__c").validate(),
            Err(Error::InvalidMapping(_))
        ));
    }

    #[test]
    fn blank_key_is_no_key() {
        let mapping = contact_mapping().with_key("  ");
        assert!(mapping.upsert_key().is_none());
        assert!(mapping.validate().is_ok());
    }

    #[test]
    fn empty_object_is_rejected() {
        let mut mapping = contact_mapping();
        mapping.salesforce_object = String::new();
        assert!(mapping.validate().is_err());
    }

    #[test]
    fn deserializes_with_defaults() {
        let mapping: Mapping = serde_json::from_value(json!({
            "id": "account",
            "localEntityType": "organization",
            "localBundle": "organization",
            "salesforceObject": "Account",
            "fieldMappings": [
                {"plugin": "properties", "localField": "name", "salesforceField": "Name"},
                {"plugin": "constant", "value": "Web", "salesforceField": "AccountSource", "direction": "push"},
                {"plugin": "related_ids", "targetEntityType": "user", "localField": "owner", "salesforceField": "OwnerId"}
            ],
            "syncTriggers": {"pushCreate": true}
        }))
        .unwrap();
        assert_eq!(mapping.pull_trigger_date, "LastModifiedDate");
        assert_eq!(mapping.field_mappings[0].direction, FieldDirection::Sync);
        assert_eq!(
            mapping.field_mappings[1].plugin,
            FieldPluginKind::Constant { value: "Web".to_string() }
        );
        assert!(mapping.sync_triggers.push_create);
        assert!(!mapping.sync_triggers.has_pull());
    }
}
