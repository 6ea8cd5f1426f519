//! Issue payload and per-record field resolution

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// A log record's own fields
pub type Record = Map<String, Value>;

/// Request body for `POST /issues.json`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketPayload {
    pub issue: Issue,
}

/// The issue to create.
///
/// Optional fields are left out of the JSON entirely rather than sent as
/// `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub project_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracker_id: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_id: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub custom_fields: Vec<Value>,

    pub subject: String,

    pub description: String,
}

/// How an override value taken from a record becomes an integer id
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CoercionMode {
    /// Integers and integer strings only; anything else fails the record
    #[default]
    Strict,
    /// Leading digits of strings, truncated floats, `0` for everything else
    Lenient,
}

/// An override value that could not be used
#[derive(Debug, Clone, PartialEq, Error)]
#[error("record field `{key}` must be {expected}, got {value}")]
pub struct CoercionError {
    pub key: String,
    pub expected: &'static str,
    pub value: Value,
}

/// Resolve priority or category id for one record.
///
/// Without an override key the configured value is returned as is. With one,
/// a record value under that key wins and is coerced to an integer; a
/// missing, `null` or `false` value falls back to the configured one. `Ok(None)` means the field is
/// left out of the payload.
pub fn resolve_numeric_field(
    configured: Option<i64>,
    override_key: Option<&str>,
    record: &Record,
    mode: CoercionMode,
) -> Result<Option<i64>, CoercionError> {
    let Some(key) = override_key else {
        return Ok(configured);
    };

    match record.get(key) {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(configured),
        Some(value) => coerce_integer(key, value, mode).map(Some),
    }
}

/// Resolve the custom field list for one record.
///
/// A record list under the override key replaces the configured list; a
/// single object counts as a one-element list.
pub fn resolve_custom_fields(
    configured: &[Value],
    override_key: Option<&str>,
    record: &Record,
) -> Result<Vec<Value>, CoercionError> {
    let value = match override_key.and_then(|key| record.get(key).map(|v| (key, v))) {
        None | Some((_, Value::Null)) => return Ok(configured.to_vec()),
        Some(found) => found,
    };

    match value {
        (_, Value::Array(fields)) => Ok(fields.clone()),
        (_, Value::Object(field)) => Ok(vec![Value::Object(field.clone())]),
        (key, other) => Err(CoercionError {
            key: key.to_string(),
            expected: "a list of custom fields",
            value: other.clone(),
        }),
    }
}

fn coerce_integer(key: &str, value: &Value, mode: CoercionMode) -> Result<i64, CoercionError> {
    let coerced = match mode {
        CoercionMode::Strict => strict_integer(value),
        CoercionMode::Lenient => lenient_integer(value),
    };
    coerced.ok_or_else(|| CoercionError {
        key: key.to_string(),
        expected: match mode {
            CoercionMode::Strict => "an integer",
            CoercionMode::Lenient => "a number or a string",
        },
        value: value.clone(),
    })
}

fn strict_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Permissive parse: optional sign and leading digits, `0` when none.
/// Only numbers and strings have an integer form.
fn lenient_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim_start();
            let (negative, digits) = match s.as_bytes().first() {
                Some(b'-') => (true, &s[1..]),
                Some(b'+') => (false, &s[1..]),
                _ => (false, s),
            };
            let end = digits
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(digits.len());
            let parsed = digits[..end].parse::<i64>().unwrap_or(0);
            Some(if negative { -parsed } else { parsed })
        }
        _ => None,
    }
}
