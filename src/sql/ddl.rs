//! DDL generation from the schema
//!
//! Synthesis runs in two phases that must not be interleaved:
//!
//! 1. [`DdlGenerator::create_tables`]: one `CREATE TABLE IF NOT EXISTS` per
//!    model, including foreign keys.
//! 2. [`DdlGenerator::create_indexes`]: one `CREATE INDEX IF NOT EXISTS` per
//!    indexed or relation field, across the whole schema.
//!
//! Every statement is idempotent and index names are derived from
//! `<model>_<field>`, so repeated runs against the same database are no-ops.

use serde_json::Value;

use crate::schema::{Field, Model, Schema};
use crate::sql::dialect::Dialect;
use crate::types::DefaultValue;

/// Referenced column when a relation target is not part of the schema
const FALLBACK_KEY_COLUMN: &str = "id";

/// DDL generator for model tables
pub struct DdlGenerator<'a> {
    dialect: &'a dyn Dialect,
}

impl<'a> DdlGenerator<'a> {
    pub fn new(dialect: &'a dyn Dialect) -> Self {
        Self { dialect }
    }

    /// Phase 1: table statements for every model, in model name order
    pub fn create_tables(&self, schema: &Schema) -> Vec<String> {
        schema
            .models()
            .map(|model| self.create_table(schema, model))
            .collect()
    }

    /// Phase 2: index statements for every model. Run only after phase 1 has
    /// completed for the whole schema.
    pub fn create_indexes(&self, schema: &Schema) -> Vec<String> {
        schema
            .models()
            .flat_map(|model| self.model_indexes(model))
            .collect()
    }

    /// Generate CREATE TABLE statement for one model
    ///
    /// Columns come first in declaration order, followed by one FOREIGN KEY
    /// constraint per relation field.
    pub fn create_table(&self, schema: &Schema, model: &Model) -> String {
        let mut parts: Vec<String> = model
            .fields()
            .iter()
            .map(|field| self.column_definition(field))
            .collect();

        for field in model.fields() {
            let Some(relation) = &field.relation else {
                continue;
            };
            let target_key = schema
                .model(&relation.to)
                .map(|target| target.primary_field().name.as_str())
                .unwrap_or(FALLBACK_KEY_COLUMN);

            let mut constraint = format!(
                "FOREIGN KEY ({}) REFERENCES {}({})",
                self.dialect.quote_identifier(&field.name),
                self.dialect.quote_identifier(&relation.to),
                self.dialect.quote_identifier(target_key)
            );
            if let Some(policy) = relation.on_delete {
                constraint.push_str(" ON DELETE ");
                constraint.push_str(policy.as_sql());
            }
            parts.push(constraint);
        }

        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.dialect.quote_identifier(&model.name),
            parts.join(", ")
        )
    }

    /// Generate CREATE INDEX statements for one model
    pub fn model_indexes(&self, model: &Model) -> Vec<String> {
        model
            .fields()
            .iter()
            .filter(|field| field.needs_index())
            .map(|field| {
                let index_name = format!("idx_{}_{}", model.name, field.name);
                format!(
                    "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                    self.dialect.quote_identifier(&index_name),
                    self.dialect.quote_identifier(&model.name),
                    self.dialect.quote_identifier(&field.name)
                )
            })
            .collect()
    }

    /// Format a single column definition for CREATE TABLE
    pub fn column_definition(&self, field: &Field) -> String {
        let mut parts = vec![
            self.dialect.quote_identifier(&field.name),
            self.dialect.column_type(field),
        ];

        if field.primary {
            if field.is_identifier() {
                parts.push(self.dialect.auto_increment_primary_key().to_string());
            } else {
                parts.push("PRIMARY KEY".to_string());
            }
        }

        if field.required && !field.nullable && !field.primary {
            parts.push("NOT NULL".to_string());
        }

        if field.unique && !field.primary {
            parts.push("UNIQUE".to_string());
        }

        if let Some(default) = &field.default {
            parts.push(format!("DEFAULT {}", self.default_literal(default)));
        }

        parts.join(" ")
    }

    /// Encode a column default as SQL text
    pub fn default_literal(&self, default: &DefaultValue) -> String {
        match default {
            DefaultValue::GeneratedAtWrite => self.dialect.current_timestamp().to_string(),
            DefaultValue::Literal(value) => match value {
                Value::String(s) => self.dialect.quote_literal(s),
                Value::Bool(b) => self.dialect.boolean_literal(*b).to_string(),
                Value::Number(n) => n.to_string(),
                Value::Null | Value::Array(_) | Value::Object(_) => "NULL".to_string(),
            },
        }
    }
}
