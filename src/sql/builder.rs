//! Statement compilation for CRUD and listing queries

use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::query::{Filter, QueryParams, Record};
use crate::schema::Model;
use crate::sql::condition::{bind, build_order_by_clause, build_where_clause};
use crate::sql::dialect::Dialect;
use crate::sql::value::SqlValue;

/// SQL text plus the arguments bound to its placeholders, in order
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<SqlValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, args: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }
}

/// Compiles requests against one model into parameterized statements
pub struct QueryBuilder<'a> {
    dialect: &'a dyn Dialect,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(dialect: &'a dyn Dialect) -> Self {
        Self { dialect }
    }

    fn table(&self, model: &Model) -> String {
        self.dialect.quote_identifier(&model.name)
    }

    fn key_clause(&self, model: &Model, id: &Value, args: &mut Vec<SqlValue>) -> String {
        let primary = model.primary_field();
        let placeholder = bind(self.dialect, args, SqlValue::for_field(primary, id));
        format!(
            "{} = {}",
            self.dialect.quote_identifier(&primary.name),
            placeholder
        )
    }

    /// SELECT with WHERE, search, ORDER BY and LIMIT/OFFSET, in that order
    pub fn select(&self, model: &Model, params: &QueryParams) -> Result<Statement> {
        let mut args = Vec::new();
        let mut sql = format!("SELECT * FROM {}", self.table(model));

        if let Some(where_clause) = build_where_clause(
            self.dialect,
            model,
            &params.filters,
            params.search_term(),
            &mut args,
        )? {
            sql.push_str(" WHERE ");
            sql.push_str(&where_clause);
        }

        sql.push_str(" ORDER BY ");
        sql.push_str(&build_order_by_clause(self.dialect, model, &params.sort)?);

        if params.page_size > 0 {
            sql.push_str(&format!(
                " LIMIT {} OFFSET {}",
                params.page_size,
                params.offset()
            ));
        }

        Ok(Statement::new(sql, args))
    }

    /// COUNT(*) over the same WHERE clause a SELECT would use
    pub fn count(&self, model: &Model, filters: &[Filter], search: Option<&str>) -> Result<Statement> {
        let mut args = Vec::new();
        let mut sql = format!("SELECT COUNT(*) FROM {}", self.table(model));

        if let Some(where_clause) = build_where_clause(self.dialect, model, filters, search, &mut args)? {
            sql.push_str(" WHERE ");
            sql.push_str(&where_clause);
        }

        Ok(Statement::new(sql, args))
    }

    pub fn get(&self, model: &Model, id: &Value) -> Statement {
        let mut args = Vec::with_capacity(1);
        let key = self.key_clause(model, id, &mut args);
        Statement::new(
            format!("SELECT * FROM {} WHERE {}", self.table(model), key),
            args,
        )
    }

    /// INSERT with one column and one placeholder per payload entry
    pub fn insert(&self, model: &Model, payload: &Record) -> Result<Statement> {
        if payload.is_empty() {
            return Ok(Statement::new(
                format!("INSERT INTO {} DEFAULT VALUES", self.table(model)),
                Vec::new(),
            ));
        }

        let mut args = Vec::with_capacity(payload.len());
        let mut columns = Vec::with_capacity(payload.len());
        let mut placeholders = Vec::with_capacity(payload.len());

        for (name, value) in payload {
            let field = model.field(name).ok_or_else(|| {
                StoreError::invalid_query(format!(
                    "unknown field '{}' on model {}",
                    name, model.name
                ))
            })?;
            columns.push(self.dialect.quote_identifier(&field.name));
            placeholders.push(bind(self.dialect, &mut args, SqlValue::for_field(field, value)));
        }

        Ok(Statement::new(
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.table(model),
                columns.join(", "),
                placeholders.join(", ")
            ),
            args,
        ))
    }

    /// UPDATE of the payload fields; the key is bound last
    pub fn update(&self, model: &Model, id: &Value, payload: &Record) -> Result<Statement> {
        if payload.is_empty() {
            return Err(StoreError::invalid_query(format!(
                "update of {} has no fields",
                model.name
            )));
        }

        let primary = &model.primary_field().name;
        let mut args = Vec::with_capacity(payload.len() + 1);
        let mut set_parts = Vec::with_capacity(payload.len());

        for (name, value) in payload {
            if name == primary {
                return Err(StoreError::invalid_query(format!(
                    "cannot update primary key '{}'",
                    name
                )));
            }
            let field = model.field(name).ok_or_else(|| {
                StoreError::invalid_query(format!(
                    "unknown field '{}' on model {}",
                    name, model.name
                ))
            })?;
            let placeholder = bind(self.dialect, &mut args, SqlValue::for_field(field, value));
            set_parts.push(format!(
                "{} = {}",
                self.dialect.quote_identifier(&field.name),
                placeholder
            ));
        }

        let key = self.key_clause(model, id, &mut args);
        Ok(Statement::new(
            format!(
                "UPDATE {} SET {} WHERE {}",
                self.table(model),
                set_parts.join(", "),
                key
            ),
            args,
        ))
    }

    pub fn delete(&self, model: &Model, id: &Value) -> Statement {
        let mut args = Vec::with_capacity(1);
        let key = self.key_clause(model, id, &mut args);
        Statement::new(
            format!("DELETE FROM {} WHERE {}", self.table(model), key),
            args,
        )
    }
}
