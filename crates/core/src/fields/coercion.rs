//! Type coercion between local values and the Salesforce wire format.

use chrono::{DateTime, Utc};
use serde_json::{Number, Value};

use crate::errors::{Error, Result};
use crate::local::{LocalFieldDefinition, LocalFieldKind};
use crate::remote::{FieldDescribe, FieldType};
use crate::sfid::Sfid;
use crate::utils::time_utils::{format_local_iso, format_soql_datetime, from_epoch, parse_datetime};

/// Shape a local value for the remote field it is pushed to.
pub fn coerce_push(value: Value, field: &FieldDescribe) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    let coerced = match &field.field_type {
        FieldType::Boolean => match &value {
            Value::String(s) if s == "false" => Value::Bool(false),
            other => Value::Bool(truthy(other)),
        },
        FieldType::Date => format_datetime(value, |dt| dt.format("%Y-%m-%d").to_string()),
        FieldType::DateTime => format_datetime(value, format_soql_datetime),
        t if t.is_floating() => to_f64(&value).map(float_value).unwrap_or(value),
        t if t.is_integer() => to_i64(&value).map(Value::from).unwrap_or(value),
        FieldType::MultiPicklist => match value {
            Value::Array(items) => Value::String(
                items
                    .iter()
                    .filter(|v| !v.is_null())
                    .map(scalar_to_string)
                    .collect::<Vec<_>>()
                    .join(";"),
            ),
            other => other,
        },
        t if t.is_id() => sfid_value(&value)?,
        FieldType::Time | FieldType::Other(_) => value,
        _ => {
            let text = match &value {
                Value::Array(items) => items
                    .iter()
                    .filter(|v| !v.is_null())
                    .map(scalar_to_string)
                    .collect::<Vec<_>>()
                    .join(";"),
                other => scalar_to_string(other),
            };
            Value::String(truncate_chars(&text, field.length))
        }
    };
    Ok(coerced)
}

/// Shape a remote value for the local field it is pulled into.
pub fn coerce_pull(
    value: Value,
    field_type: &FieldType,
    local: Option<&LocalFieldDefinition>,
) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    let coerced = match field_type {
        FieldType::Boolean => match &value {
            Value::String(s) if s.eq_ignore_ascii_case("false") => Value::Bool(false),
            other => Value::Bool(truthy(other)),
        },
        FieldType::Date | FieldType::DateTime => {
            let parsed = value.as_str().and_then(parse_datetime);
            match (local.map(|d| &d.kind), parsed) {
                (Some(LocalFieldKind::IsoDateTime), Some(dt)) => Value::String(format_local_iso(&dt)),
                (Some(LocalFieldKind::Date), Some(dt)) => {
                    Value::String(dt.format("%Y-%m-%d").to_string())
                }
                (Some(LocalFieldKind::Timestamp), Some(dt)) => Value::from(dt.timestamp()),
                _ => value,
            }
        }
        t if t.is_floating() => to_f64(&value).map(float_value).unwrap_or(value),
        t if t.is_integer() => to_i64(&value).map(Value::from).unwrap_or(value),
        FieldType::MultiPicklist => match value {
            Value::String(s) => Value::Array(
                s.split(';')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(|part| Value::String(part.to_string()))
                    .collect(),
            ),
            other => other,
        },
        t if t.is_id() => sfid_value(&value)?,
        _ => match (value, local.and_then(|d| d.max_length)) {
            (Value::String(s), Some(max)) => Value::String(truncate_chars(&s, max)),
            (other, _) => other,
        },
    };
    Ok(coerced)
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.trunc() as i64))
        }
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn float_value(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn format_datetime(value: Value, format: impl Fn(&DateTime<Utc>) -> String) -> Value {
    let parsed = match &value {
        Value::String(s) => parse_datetime(s),
        Value::Number(n) => n.as_i64().and_then(from_epoch),
        _ => None,
    };
    match parsed {
        Some(dt) => Value::String(format(&dt)),
        None => value,
    }
}

fn sfid_value(value: &Value) -> Result<Value> {
    match value {
        Value::String(s) if s.trim().is_empty() => Ok(Value::Null),
        Value::String(s) => Ok(Value::String(Sfid::new(s)?.to_string())),
        other => Err(Error::InvalidIdentifier(other.to_string())),
    }
}

/// Truncate to at most `max` characters; 0 means unlimited.
fn truncate_chars(s: &str, max: usize) -> String {
    if max == 0 {
        return s.to_string();
    }
    s.chars().take(max).collect()
}
