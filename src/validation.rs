//! Record validation against the schema
//!
//! [`Validator`] checks create and update payloads field by field before any
//! statement is compiled. Checks stop at the first failing field.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{StoreError, ValidationError};
use crate::query::Record;
use crate::schema::{Field, Model, Schema};
use crate::types::TypeRule;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^\s/$.?#].[^\s]*$").expect("valid url regex"));

/// Validates payloads for one schema
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    schema: &'a Schema,
}

impl<'a> Validator<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Validate a create payload.
    ///
    /// Every field except a generated identifier is checked; required fields
    /// must be present.
    pub fn validate_create(&self, model: &str, payload: &Record) -> Result<(), StoreError> {
        let model = self.schema.require_model(model)?;
        check_create(model, payload)?;
        Ok(())
    }

    /// Validate an update payload.
    ///
    /// Only the fields present are checked. Unknown fields and the primary key
    /// are rejected.
    pub fn validate_update(&self, model: &str, payload: &Record) -> Result<(), StoreError> {
        let model = self.schema.require_model(model)?;
        check_update(model, payload)?;
        Ok(())
    }
}

pub(crate) fn check_create(model: &Model, payload: &Record) -> Result<(), ValidationError> {
    for field in model.fields() {
        if field.is_identifier() {
            continue;
        }
        match payload.get(&field.name) {
            Some(value) => check_field(field, value)?,
            None if field.required => {
                return Err(ValidationError::new(&field.name, "field is required"));
            }
            None => {}
        }
    }
    Ok(())
}

pub(crate) fn check_update(model: &Model, payload: &Record) -> Result<(), ValidationError> {
    let primary = model.primary_field();
    if payload.contains_key(&primary.name) {
        return Err(ValidationError::new(
            &primary.name,
            "cannot update primary key",
        ));
    }

    for (name, value) in payload {
        let field = model
            .field(name)
            .ok_or_else(|| ValidationError::new(name, "field does not exist"))?;
        check_field(field, value)?;
    }
    Ok(())
}

/// Check one value against its field
pub fn check_field(field: &Field, value: &Value) -> Result<(), ValidationError> {
    if value.is_null() {
        if field.nullable {
            return Ok(());
        }
        if field.required {
            return Err(ValidationError::new(&field.name, "field is required"));
        }
        // Storage may still reject this if the column is NOT NULL
        tracing::warn!(
            field = %field.name,
            "accepting null for optional non-nullable field"
        );
        return Ok(());
    }

    match field.field_type.rule() {
        TypeRule::Text => check_text(field, value),
        TypeRule::Number => check_number(field, value),
        TypeRule::Boolean => check_boolean(field, value),
        TypeRule::Email => check_matches(field, value, &EMAIL_RE, "must be a valid email address"),
        TypeRule::Url => check_matches(field, value, &URL_RE, "must be a valid URL"),
        TypeRule::Enum => check_enum(field, value),
        TypeRule::Temporal => as_str(field, value).map(|_| ()),
        TypeRule::Unchecked => Ok(()),
    }
}

fn as_str<'v>(field: &Field, value: &'v Value) -> Result<&'v str, ValidationError> {
    value
        .as_str()
        .ok_or_else(|| ValidationError::new(&field.name, "must be a string"))
}

fn check_text(field: &Field, value: &Value) -> Result<(), ValidationError> {
    let s = as_str(field, value)?;
    let len = s.chars().count() as i64;

    if let Some(min) = field.min {
        if len < min {
            return Err(ValidationError::new(
                &field.name,
                format!("must be at least {} characters", min),
            ));
        }
    }
    if let Some(max) = field.max {
        if len > max {
            return Err(ValidationError::new(
                &field.name,
                format!("must be at most {} characters", max),
            ));
        }
    }
    if let Some(pattern) = &field.pattern {
        if !pattern.is_match(s) {
            return Err(ValidationError::new(
                &field.name,
                "does not match required pattern",
            ));
        }
    }
    Ok(())
}

fn check_number(field: &Field, value: &Value) -> Result<(), ValidationError> {
    let num = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
    .ok_or_else(|| ValidationError::new(&field.name, "must be a number"))?;

    if let Some(min) = field.min {
        if num < min as f64 {
            return Err(ValidationError::new(
                &field.name,
                format!("must be at least {}", min),
            ));
        }
    }
    if let Some(max) = field.max {
        if num > max as f64 {
            return Err(ValidationError::new(
                &field.name,
                format!("must be at most {}", max),
            ));
        }
    }
    Ok(())
}

fn check_boolean(field: &Field, value: &Value) -> Result<(), ValidationError> {
    if value.is_boolean() {
        Ok(())
    } else {
        Err(ValidationError::new(&field.name, "must be a boolean"))
    }
}

fn check_matches(
    field: &Field,
    value: &Value,
    re: &Regex,
    message: &str,
) -> Result<(), ValidationError> {
    let s = as_str(field, value)?;
    if re.is_match(s) {
        Ok(())
    } else {
        Err(ValidationError::new(&field.name, message))
    }
}

fn check_enum(field: &Field, value: &Value) -> Result<(), ValidationError> {
    let s = as_str(field, value)?;
    if field.options.iter().any(|o| o == s) {
        Ok(())
    } else {
        Err(ValidationError::new(
            &field.name,
            format!("must be one of: {}", field.options.join(", ")),
        ))
    }
}
