//! Host-side record representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{Error, Result};

/// A local entity as seen by the sync core.
///
/// Field values are addressed by selector strings; a dotted selector
/// (`address.city`, `tags.0`) walks nested objects and arrays.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalRecord {
    pub entity_type: String,
    pub bundle: String,
    /// `None` until the store has saved the record.
    pub id: Option<String>,
    #[serde(default)]
    pub fields: Map<String, Value>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl LocalRecord {
    pub fn new(entity_type: &str, bundle: &str) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            bundle: bundle.to_string(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    /// Builder form of [`LocalRecord::set`].
    pub fn with_field(mut self, selector: &str, value: Value) -> Result<Self> {
        self.set(selector, value)?;
        Ok(self)
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    pub fn id_str(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }

    pub fn get(&self, selector: &str) -> Option<&Value> {
        let mut parts = selector.split('.');
        let mut current = self.fields.get(parts.next()?)?;
        for part in parts {
            current = match current {
                Value::Object(map) => map.get(part)?,
                Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn get_str(&self, selector: &str) -> Option<&str> {
        self.get(selector).and_then(Value::as_str)
    }

    /// Write a value, creating intermediate objects as needed.
    pub fn set(&mut self, selector: &str, value: Value) -> Result<()> {
        let parts: Vec<&str> = selector.split('.').collect();
        let Some((last, parents)) = parts.split_last() else {
            return Err(Error::local_store("Empty field selector"));
        };
        if last.is_empty() {
            return Err(Error::local_store(format!("Invalid field selector '{}'", selector)));
        }

        let mut current = &mut self.fields;
        for part in parents {
            let entry = current
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            current = match entry {
                Value::Object(map) => map,
                _ => {
                    return Err(Error::local_store(format!(
                        "Cannot write '{}': '{}' is not an object",
                        selector, part
                    )))
                }
            };
        }
        current.insert(last.to_string(), value);
        Ok(())
    }
}

/// Storage kind of a local field, used to shape pulled values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalFieldKind {
    Text,
    Integer,
    Decimal,
    Boolean,
    /// `YYYY-MM-DD`
    Date,
    /// Zone-less ISO date-time, `YYYY-MM-DDTHH:MM:SS`.
    IsoDateTime,
    /// Unix epoch seconds.
    Timestamp,
    /// Reference to another local entity.
    Reference { target_entity_type: String },
    /// Multi-valued field.
    List,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalFieldDefinition {
    pub kind: LocalFieldKind,
    #[serde(default)]
    pub max_length: Option<usize>,
}

impl LocalFieldDefinition {
    pub fn new(kind: LocalFieldKind) -> Self {
        Self {
            kind,
            max_length: None,
        }
    }

    pub fn text(max_length: usize) -> Self {
        Self {
            kind: LocalFieldKind::Text,
            max_length: Some(max_length),
        }
    }
}
