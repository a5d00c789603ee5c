//! Single-object SELECT statements for the REST query endpoint.

use std::fmt;

use super::condition::{validate_operator, SoqlValue};
use super::{SoqlStatement, SortDirection};
use crate::errors::Result;

/// Characters passed through unescaped in addition to ASCII alphanumerics.
const URL_SAFE: &[char] = &['-', '_', '.', '~', ',', '\'', '(', ')', '=', ':', '*', '!', '/'];

/// Encode query text for a `q=` parameter: spaces become `+`, reserved
/// characters are percent-encoded, SOQL punctuation stays readable.
pub fn encode_for_url(soql: &str) -> String {
    let mut encoded = String::with_capacity(soql.len());
    for ch in soql.chars() {
        if ch == ' ' {
            encoded.push('+');
        } else if ch.is_ascii_alphanumeric() || URL_SAFE.contains(&ch) {
            encoded.push(ch);
        } else {
            let mut buf = [0u8; 4];
            encoded.push_str(&urlencoding::encode(ch.encode_utf8(&mut buf)));
        }
    }
    encoded
}

#[derive(Debug, Clone, PartialEq)]
struct SelectCondition {
    field: String,
    operator: String,
    value: String,
}

/// SELECT against one object, no aliases.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectQuery {
    pub object_type: String,
    pub fields: Vec<String>,
    conditions: Vec<SelectCondition>,
    order: Vec<(String, SortDirection)>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl SelectQuery {
    pub fn new(object_type: &str) -> Self {
        Self {
            object_type: object_type.to_string(),
            ..Self::default()
        }
    }

    pub fn field(&mut self, field: &str) -> &mut Self {
        if !self.fields.iter().any(|f| f.eq_ignore_ascii_case(field)) {
            self.fields.push(field.to_string());
        }
        self
    }

    pub fn add_fields<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for field in fields {
            self.field(field.as_ref());
        }
        self
    }

    /// Add an AND-ed condition. A list value with `=` becomes `IN`.
    pub fn add_condition(
        &mut self,
        field: &str,
        value: impl Into<SoqlValue>,
        operator: &str,
    ) -> Result<&mut Self> {
        validate_operator(operator)?;
        let value = value.into();
        let mut operator = operator.trim().to_ascii_uppercase();
        if value.is_list() && operator == "=" {
            operator = "IN".to_string();
        }
        self.conditions.push(SelectCondition {
            field: field.to_string(),
            operator,
            value: value.to_string(),
        });
        Ok(self)
    }

    /// Add a raw WHERE fragment (e.g. an admin-configured filter).
    pub fn add_raw_condition(&mut self, fragment: &str) -> &mut Self {
        let fragment = fragment.trim();
        if !fragment.is_empty() {
            self.conditions.push(SelectCondition {
                field: format!("({})", fragment),
                operator: String::new(),
                value: String::new(),
            });
        }
        self
    }

    pub fn order(&mut self, field: &str, direction: SortDirection) -> &mut Self {
        self.order.push((field.to_string(), direction));
        self
    }

    pub fn has_conditions(&self) -> bool {
        !self.conditions.is_empty()
    }
}

impl SoqlStatement for SelectQuery {
    fn soql(&self) -> String {
        let mut query = format!("SELECT {} FROM {}", self.fields.join(","), self.object_type);

        if !self.conditions.is_empty() {
            let clauses = self
                .conditions
                .iter()
                .map(|c| {
                    [c.field.as_str(), c.operator.as_str(), c.value.as_str()]
                        .iter()
                        .filter(|part| !part.is_empty())
                        .copied()
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect::<Vec<_>>()
                .join(" AND ");
            query.push_str(" WHERE ");
            query.push_str(&clauses);
        }
        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|(field, dir)| format!("{} {}", field, dir))
                .collect::<Vec<_>>()
                .join(", ");
            query.push_str(" ORDER BY ");
            query.push_str(&order);
        }
        if let Some(limit) = self.limit {
            query.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = self.offset.filter(|o| *o > 0) {
            query.push_str(&format!(" OFFSET {}", offset));
        }
        query
    }
}

impl fmt::Display for SelectQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url_encoded())
    }
}

/// A prebuilt SOQL string sent through the same encoding as [`SelectQuery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQueryRaw(String);

impl SelectQueryRaw {
    pub fn new(soql: impl Into<String>) -> Self {
        Self(soql.into())
    }
}

impl SoqlStatement for SelectQueryRaw {
    fn soql(&self) -> String {
        self.0.clone()
    }
}

impl fmt::Display for SelectQueryRaw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url_encoded())
    }
}
