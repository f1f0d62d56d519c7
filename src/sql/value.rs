//! Typed scalar values bound to statement placeholders

use serde_json::Value;

use crate::schema::Field;
use crate::types::StorageAffinity;

/// A scalar bound to a placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Bool(bool),
}

impl SqlValue {
    /// Convert a JSON value without field context.
    ///
    /// Arrays and objects are stored as their JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => SqlValue::Integer(i),
                None => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
            },
            Value::String(s) => SqlValue::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
        }
    }

    /// Convert a JSON value to the field's storage affinity.
    ///
    /// Strings arriving for integer and boolean columns (query string filters,
    /// form posts) are parsed; anything that does not parse falls back to
    /// [`SqlValue::from_json`].
    pub fn for_field(field: &Field, value: &Value) -> Self {
        match (field.field_type.affinity(), value) {
            (StorageAffinity::Integer, Value::String(s)) => {
                let s = s.trim();
                if let Ok(i) = s.parse::<i64>() {
                    SqlValue::Integer(i)
                } else if let Ok(f) = s.parse::<f64>() {
                    SqlValue::Real(f)
                } else {
                    SqlValue::from_json(value)
                }
            }
            (StorageAffinity::Boolean, Value::String(s)) => match s.as_str() {
                "true" | "1" => SqlValue::Bool(true),
                "false" | "0" => SqlValue::Bool(false),
                _ => SqlValue::from_json(value),
            },
            (StorageAffinity::Boolean, Value::Number(n)) => match n.as_i64() {
                Some(0) => SqlValue::Bool(false),
                Some(1) => SqlValue::Bool(true),
                _ => SqlValue::from_json(value),
            },
            _ => SqlValue::from_json(value),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Real(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&Value> for SqlValue {
    fn from(v: &Value) -> Self {
        SqlValue::from_json(v)
    }
}
