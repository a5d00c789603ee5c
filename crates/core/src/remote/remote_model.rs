//! Remote object metadata and record payloads.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{Error, Result};
use crate::sfid::Sfid;
use crate::utils::time_utils::parse_datetime;

/// Salesforce field type, as reported by describe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    Boolean,
    Date,
    DateTime,
    Time,
    Double,
    Currency,
    Percent,
    Int,
    Long,
    Picklist,
    MultiPicklist,
    Id,
    Reference,
    String,
    TextArea,
    Email,
    Phone,
    Url,
    Other(String),
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::DateTime => "datetime",
            FieldType::Time => "time",
            FieldType::Double => "double",
            FieldType::Currency => "currency",
            FieldType::Percent => "percent",
            FieldType::Int => "int",
            FieldType::Long => "long",
            FieldType::Picklist => "picklist",
            FieldType::MultiPicklist => "multipicklist",
            FieldType::Id => "id",
            FieldType::Reference => "reference",
            FieldType::String => "string",
            FieldType::TextArea => "textarea",
            FieldType::Email => "email",
            FieldType::Phone => "phone",
            FieldType::Url => "url",
            FieldType::Other(name) => name.as_str(),
        }
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, FieldType::Double | FieldType::Currency | FieldType::Percent)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, FieldType::Int | FieldType::Long)
    }

    pub fn is_id(&self) -> bool {
        matches!(self, FieldType::Id | FieldType::Reference)
    }
}

impl From<String> for FieldType {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "boolean" => FieldType::Boolean,
            "date" => FieldType::Date,
            "datetime" => FieldType::DateTime,
            "time" => FieldType::Time,
            "double" => FieldType::Double,
            "currency" => FieldType::Currency,
            "percent" => FieldType::Percent,
            "int" => FieldType::Int,
            "long" => FieldType::Long,
            "picklist" => FieldType::Picklist,
            "multipicklist" => FieldType::MultiPicklist,
            "id" => FieldType::Id,
            "reference" => FieldType::Reference,
            "string" => FieldType::String,
            "textarea" => FieldType::TextArea,
            "email" => FieldType::Email,
            "phone" => FieldType::Phone,
            "url" => FieldType::Url,
            _ => FieldType::Other(value),
        }
    }
}

impl From<&str> for FieldType {
    fn from(value: &str) -> Self {
        FieldType::from(value.to_string())
    }
}

impl From<FieldType> for String {
    fn from(value: FieldType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of an object's `fields` describe array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescribe {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Max length for text fields; 0 when not applicable.
    #[serde(default)]
    pub length: usize,
    #[serde(default)]
    pub updateable: bool,
    #[serde(default)]
    pub createable: bool,
    #[serde(default)]
    pub nillable: bool,
    #[serde(default)]
    pub external_id: bool,
    #[serde(default)]
    pub reference_to: Vec<String>,
}

impl FieldDescribe {
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            label: name.to_string(),
            field_type,
            length: 0,
            updateable: true,
            createable: true,
            nillable: true,
            external_id: false,
            reference_to: Vec::new(),
        }
    }

    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }
}

/// Describe result for one object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub key_prefix: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDescribe>,
}

impl ObjectMetadata {
    pub fn new(name: &str, fields: Vec<FieldDescribe>) -> Self {
        Self {
            name: name.to_string(),
            label: name.to_string(),
            key_prefix: None,
            fields,
        }
    }

    /// Look up a field by API name (case-insensitive).
    pub fn field(&self, name: &str) -> Result<&FieldDescribe> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::field_not_found(&self.name, name))
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }
}

/// Catalog entry from the global describe (`/sobjects`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSummary {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl ObjectSummary {
    /// True when every `(key, expected)` pair matches a boolean attribute.
    pub fn matches(&self, filter: &[(&str, bool)]) -> bool {
        filter.iter().all(|(key, expected)| {
            self.attributes.get(*key).and_then(Value::as_bool) == Some(*expected)
        })
    }
}

/// A record returned by a read or query.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteRecord {
    pub fields: Map<String, Value>,
}

impl RemoteRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn id(&self) -> Option<Sfid> {
        self.get_str("Id").and_then(|id| Sfid::new(id).ok())
    }

    /// Object type from the `attributes` block, if present.
    pub fn object_type(&self) -> Option<&str> {
        self.fields
            .get("attributes")
            .and_then(|a| a.get("type"))
            .and_then(Value::as_str)
    }

    /// Read a field; dotted names follow relationship objects (`Owner.Name`).
    pub fn get(&self, field: &str) -> Option<&Value> {
        let mut parts = field.split('.');
        let first = parts.next()?;
        let mut current = get_ci(&self.fields, first)?;
        for part in parts {
            current = current.as_object().and_then(|obj| get_ci(obj, part))?;
        }
        Some(current)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn get_datetime(&self, field: &str) -> Option<DateTime<Utc>> {
        self.get_str(field).and_then(parse_datetime)
    }
}

fn get_ci<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).or_else(|| {
        map.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

/// One page of query results.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    #[serde(default)]
    pub total_size: u64,
    #[serde(default = "default_true")]
    pub done: bool,
    #[serde(default)]
    pub records: Vec<RemoteRecord>,
    #[serde(default)]
    pub next_records_url: Option<String>,
}

fn default_true() -> bool {
    true
}

impl QueryResult {
    pub fn has_more(&self) -> bool {
        !self.done && self.next_records_url.is_some()
    }
}

/// Entry from the `/deleted` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedRecord {
    pub id: Sfid,
    pub deleted_date: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedResult {
    #[serde(default)]
    pub deleted_records: Vec<DeletedRecord>,
    #[serde(default)]
    pub earliest_date_available: Option<String>,
    #[serde(default)]
    pub latest_date_covered: Option<String>,
}

/// Outcome of an upsert by external id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertResult {
    pub id: Option<Sfid>,
    /// False when the key matched an existing record.
    pub created: bool,
}
