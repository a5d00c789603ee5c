//! WHERE / HAVING condition trees and literal formatting.

use std::fmt;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use super::SoqlQuery;
use crate::errors::{Error, Result};
use crate::sfid::Sfid;

/// Characters that never appear in a legitimate SOQL operator.
const FORBIDDEN_OPERATOR_CHARS: &[char] = &['-', '\'', '"', '(', ')', ';'];

/// Reject operators that could smuggle extra query text.
pub fn validate_operator(operator: &str) -> Result<()> {
    if operator.to_ascii_uppercase().contains("UNION")
        || operator.contains(FORBIDDEN_OPERATOR_CHARS)
    {
        return Err(Error::QueryOperatorRejected(operator.to_string()));
    }
    Ok(())
}

/// Escape a string for use inside a single-quoted SOQL literal.
pub fn escape_soql_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// A value on the right-hand side of a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum SoqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Quoted and escaped.
    Str(String),
    /// `YYYY-MM-DD`, unquoted.
    Date(NaiveDate),
    /// ISO-8601 UTC, unquoted.
    DateTime(DateTime<Utc>),
    /// Inserted verbatim (date literals such as `LAST_N_DAYS:7`, bind values).
    Raw(String),
    List(Vec<SoqlValue>),
    Subquery(Box<SoqlQuery>),
}

impl SoqlValue {
    pub fn raw(value: impl Into<String>) -> Self {
        Self::Raw(value.into())
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }
}

impl fmt::Display for SoqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoqlValue::Null => f.write_str("null"),
            SoqlValue::Bool(v) => write!(f, "{}", v),
            SoqlValue::Int(v) => write!(f, "{}", v),
            SoqlValue::Float(v) => write!(f, "{}", v),
            SoqlValue::Str(v) => write!(f, "'{}'", escape_soql_string(v)),
            SoqlValue::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            SoqlValue::DateTime(v) => {
                f.write_str(&v.to_rfc3339_opts(SecondsFormat::Secs, true))
            }
            SoqlValue::Raw(v) => f.write_str(v),
            SoqlValue::List(values) => {
                let items = values
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "({})", items)
            }
            SoqlValue::Subquery(query) => write!(f, "({})", query),
        }
    }
}

impl From<&str> for SoqlValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for SoqlValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<bool> for SoqlValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for SoqlValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for SoqlValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for SoqlValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<NaiveDate> for SoqlValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<DateTime<Utc>> for SoqlValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::DateTime(value)
    }
}

impl From<&Sfid> for SoqlValue {
    fn from(value: &Sfid) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<SoqlQuery> for SoqlValue {
    fn from(value: SoqlQuery) -> Self {
        Self::Subquery(Box::new(value))
    }
}

impl<T: Into<SoqlValue>> From<Vec<T>> for SoqlValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

/// How sibling conditions are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

impl fmt::Display for Conjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conjunction::And => f.write_str("AND"),
            Conjunction::Or => f.write_str("OR"),
        }
    }
}

/// Left-hand side of a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionField {
    Column(String),
    /// Rendered in parentheses; operator and value are ignored.
    Subquery(Box<SoqlQuery>),
    /// A complete snippet; operator and value are ignored.
    Raw(String),
}

impl From<&str> for ConditionField {
    fn from(value: &str) -> Self {
        Self::Column(value.to_string())
    }
}

impl From<String> for ConditionField {
    fn from(value: String) -> Self {
        Self::Column(value)
    }
}

impl From<SoqlQuery> for ConditionField {
    fn from(value: SoqlQuery) -> Self {
        Self::Subquery(Box::new(value))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: ConditionField,
    pub operator: Option<String>,
    pub value: Option<SoqlValue>,
}

impl Condition {
    /// Build a validated condition. `operator` of `None` means `=` (or `IN` for lists).
    pub fn new(
        field: impl Into<ConditionField>,
        value: impl Into<SoqlValue>,
        operator: Option<&str>,
    ) -> Result<Self> {
        if let Some(op) = operator {
            validate_operator(op)?;
        }
        Ok(Self {
            field: field.into(),
            operator: operator.map(|op| op.trim().to_string()),
            value: Some(value.into()),
        })
    }

    pub fn raw(snippet: impl Into<String>) -> Self {
        Self {
            field: ConditionField::Raw(snippet.into()),
            operator: None,
            value: None,
        }
    }

    fn render(&self) -> String {
        let column = match &self.field {
            ConditionField::Subquery(query) => return format!("({})", query),
            ConditionField::Raw(snippet) => return snippet.clone(),
            ConditionField::Column(column) => column,
        };

        let value = self.value.clone().unwrap_or(SoqlValue::Null);
        let mut operator = self
            .operator
            .clone()
            .unwrap_or_else(|| "=".to_string())
            .to_ascii_uppercase();
        if value.is_list() && operator == "=" {
            operator = "IN".to_string();
        }

        if operator == "NOT LIKE" {
            return format!("NOT ({} LIKE {})", column, value);
        }
        format!("{} {} {}", column, operator, value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConditionItem {
    Condition(Condition),
    Group(ConditionGroup),
}

/// An ordered list of conditions joined by one conjunction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConditionGroup {
    pub conjunction: Conjunction,
    pub items: Vec<ConditionItem>,
}

impl ConditionGroup {
    pub fn new(conjunction: Conjunction) -> Self {
        Self {
            conjunction,
            items: Vec::new(),
        }
    }

    pub fn and() -> Self {
        Self::new(Conjunction::And)
    }

    pub fn or() -> Self {
        Self::new(Conjunction::Or)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn push(&mut self, condition: Condition) {
        self.items.push(ConditionItem::Condition(condition));
    }

    pub fn push_group(&mut self, group: ConditionGroup) {
        if !group.is_empty() {
            self.items.push(ConditionItem::Group(group));
        }
    }

    /// Builder-style validated condition.
    pub fn condition(
        mut self,
        field: impl Into<ConditionField>,
        value: impl Into<SoqlValue>,
        operator: Option<&str>,
    ) -> Result<Self> {
        self.push(Condition::new(field, value, operator)?);
        Ok(self)
    }

    fn render_item(item: &ConditionItem) -> String {
        match item {
            ConditionItem::Condition(condition) => condition.render(),
            ConditionItem::Group(group) if group.len() > 1 => format!("({})", group),
            ConditionItem::Group(group) => group.to_string(),
        }
    }
}

impl fmt::Display for ConditionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.items.as_slice() {
            [] => Ok(()),
            [single] => f.write_str(&Self::render_item(single)),
            items => {
                let joined = items
                    .iter()
                    .map(|item| format!("({})", Self::render_item(item)))
                    .collect::<Vec<_>>()
                    .join(&format!(" {} ", self.conjunction));
                f.write_str(&joined)
            }
        }
    }
}
