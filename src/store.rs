//! Store - persistence engine over SQLite
//!
//! `Store` owns the connection pool and the immutable schema. It synthesizes
//! tables and indexes at startup and runs validated, compiled CRUD statements,
//! mapping rows back into [`Record`]s. Every call is one autocommit statement
//! with no retry.

use std::str::FromStr;

use serde_json::Value;
use sqlx::query::Query;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteQueryResult,
    SqliteRow,
};
use sqlx::{Column, Row, Sqlite, TypeInfo, ValueRef};

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::query::{Filter, Page, PageMeta, QueryParams, Record};
use crate::schema::{Model, Schema};
use crate::sql::builder::{QueryBuilder, Statement};
use crate::sql::ddl::DdlGenerator;
use crate::sql::dialect::{Dialect, Sqlite as SqliteDialect};
use crate::sql::value::SqlValue;
use crate::types::{FieldType, StorageAffinity};
use crate::validation::{self, Validator};

/// Schema-driven SQLite record store
pub struct Store {
    /// Database connection pool
    pool: SqlitePool,
    /// Models this store serves
    schema: Schema,
    dialect: SqliteDialect,
}

impl Store {
    /// Connect to the database described by `config`
    ///
    /// Tables are not created here; call [`Store::create_schema`] once at startup.
    pub async fn new(config: StoreConfig, schema: Schema) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.database_url)
            .map_err(|e| StoreError::Connection(format!("Invalid database URL: {}", e)))?
            .foreign_keys(config.foreign_keys)
            .create_if_missing(config.create_if_missing)
            .busy_timeout(config.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Connection(format!("Database connection failed: {}", e)))?;

        tracing::info!(
            url = %config.database_url,
            max_connections = config.max_connections,
            models = schema.len(),
            "connected to database"
        );

        Ok(Self::from_pool(pool, schema))
    }

    /// Create a store from an existing pool
    ///
    /// Use this when the pool is shared with other components.
    pub fn from_pool(pool: SqlitePool, schema: Schema) -> Self {
        Self {
            pool,
            schema,
            dialect: SqliteDialect,
        }
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Validator bound to this store's schema
    pub fn validator(&self) -> Validator<'_> {
        Validator::new(&self.schema)
    }

    fn builder(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(&self.dialect)
    }

    fn model(&self, name: &str) -> Result<&Model> {
        self.schema.require_model(name)
    }

    // =========================================================================
    // Schema Synthesis
    // =========================================================================

    /// Create all tables, then all indexes.
    ///
    /// Idempotent. Indexes are only created once every table exists, so a
    /// relation column can be indexed regardless of model order.
    pub async fn create_schema(&self) -> Result<()> {
        let generator = DdlGenerator::new(&self.dialect);

        let tables = generator.create_tables(&self.schema);
        for ddl in &tables {
            tracing::debug!(sql = %ddl, "create table");
            sqlx::query(ddl).execute(&self.pool).await?;
        }

        let indexes = generator.create_indexes(&self.schema);
        for ddl in &indexes {
            tracing::debug!(sql = %ddl, "create index");
            sqlx::query(ddl).execute(&self.pool).await?;
        }

        tracing::info!(
            dialect = self.dialect.name(),
            tables = tables.len(),
            indexes = indexes.len(),
            "schema synchronized"
        );
        Ok(())
    }

    // =========================================================================
    // Record Operations
    // =========================================================================

    /// List records matching `params`. Never fails on an empty table; the
    /// result is then an empty vector.
    pub async fn query(&self, model: &str, params: &QueryParams) -> Result<Vec<Record>> {
        let model = self.model(model)?;
        let stmt = self.builder().select(model, params)?;

        let rows = self.fetch_all(&stmt).await?;
        rows.iter().map(|row| row_to_record(row, model)).collect()
    }

    /// Fetch one record by primary key
    pub async fn get(&self, model: &str, id: &Value) -> Result<Record> {
        let model = self.model(model)?;
        let stmt = self.builder().get(model, id);

        tracing::debug!(sql = %stmt.sql, args = ?stmt.args, "query");
        let row = bind_args(sqlx::query(&stmt.sql), &stmt.args)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::record_not_found(format!("{} {}", model.name, id)))?;

        row_to_record(&row, model)
    }

    /// Validate and insert a record, returning its primary key
    pub async fn create(&self, model: &str, payload: Record) -> Result<Value> {
        let model = self.model(model)?;
        validation::check_create(model, &payload)?;

        let stmt = self.builder().insert(model, &payload)?;
        let result = self.execute(&stmt).await?;

        let primary = model.primary_field();
        let id = if primary.is_identifier() {
            Value::from(result.last_insert_rowid())
        } else {
            payload
                .get(&primary.name)
                .filter(|v| !v.is_null())
                .cloned()
                .unwrap_or_else(|| Value::from(result.last_insert_rowid()))
        };
        Ok(id)
    }

    /// Validate and apply a partial update
    ///
    /// Password fields sent as `null` or `""` are left unchanged.
    pub async fn update(&self, model: &str, id: &Value, mut payload: Record) -> Result<()> {
        let model = self.model(model)?;
        strip_blank_passwords(model, &mut payload);
        validation::check_update(model, &payload)?;

        if payload.is_empty() {
            tracing::debug!(model = %model.name, id = %id, "empty update, nothing to do");
            return Ok(());
        }

        let stmt = self.builder().update(model, id, &payload)?;
        let result = self.execute(&stmt).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::record_not_found(format!("{} {}", model.name, id)));
        }
        Ok(())
    }

    pub async fn delete(&self, model: &str, id: &Value) -> Result<()> {
        let model = self.model(model)?;
        let stmt = self.builder().delete(model, id);

        let result = self.execute(&stmt).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::record_not_found(format!("{} {}", model.name, id)));
        }
        Ok(())
    }

    /// Count records matching `filters`
    pub async fn count(&self, model: &str, filters: &[Filter]) -> Result<i64> {
        let model = self.model(model)?;
        self.count_matching(model, filters, None).await
    }

    /// One page of records plus the total for the same filters and search
    pub async fn list(&self, model: &str, params: &QueryParams) -> Result<Page> {
        let data = self.query(model, params).await?;
        let model = self.model(model)?;
        let total = self
            .count_matching(model, &params.filters, params.search_term())
            .await?;

        Ok(Page {
            data,
            meta: PageMeta::new(params.page.max(1), params.page_size, total),
        })
    }

    // =========================================================================
    // Execution Helpers
    // =========================================================================

    async fn count_matching(
        &self,
        model: &Model,
        filters: &[Filter],
        search: Option<&str>,
    ) -> Result<i64> {
        let stmt = self.builder().count(model, filters, search)?;

        tracing::debug!(sql = %stmt.sql, args = ?stmt.args, "query");
        let row = bind_args(sqlx::query(&stmt.sql), &stmt.args)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<i64, _>(0)?)
    }

    async fn fetch_all(&self, stmt: &Statement) -> Result<Vec<SqliteRow>> {
        tracing::debug!(sql = %stmt.sql, args = ?stmt.args, "query");
        Ok(bind_args(sqlx::query(&stmt.sql), &stmt.args)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn execute(&self, stmt: &Statement) -> Result<SqliteQueryResult> {
        tracing::debug!(sql = %stmt.sql, args = ?stmt.args, "execute");
        Ok(bind_args(sqlx::query(&stmt.sql), &stmt.args)
            .execute(&self.pool)
            .await?)
    }
}

fn strip_blank_passwords(model: &Model, payload: &mut Record) {
    payload.retain(|name, value| {
        let is_password = model
            .field(name)
            .is_some_and(|f| f.field_type == FieldType::Password);
        let blank = value.is_null() || value.as_str().is_some_and(str::is_empty);
        !(is_password && blank)
    });
}

fn bind_args<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    args: &[SqlValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for arg in args {
        query = match arg {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Integer(i) => query.bind(*i),
            SqlValue::Real(f) => query.bind(*f),
            SqlValue::Text(s) => query.bind(s.clone()),
            SqlValue::Bool(b) => query.bind(*b),
        };
    }
    query
}

/// Map a row into a record using each value's runtime storage class
///
/// The declared field decides the JSON shape where SQLite's column affinity
/// would otherwise leak through: a `DATETIME` column stores `"2024"` as an
/// integer, but the field still reads back as a string.
fn row_to_record(row: &SqliteRow, model: &Model) -> Result<Record> {
    let mut record = Record::new();

    for (i, column) in row.columns().iter().enumerate() {
        let name = column.name();
        let affinity = model.field(name).map(|f| f.field_type.affinity());
        let storage_class = {
            let raw = row.try_get_raw(i)?;
            if raw.is_null() {
                None
            } else {
                Some(raw.type_info().name().to_ascii_uppercase())
            }
        };

        let value = match storage_class.as_deref() {
            None => Value::Null,
            Some("INTEGER" | "INT" | "INT8" | "BIGINT" | "BOOLEAN" | "BOOL") => {
                let v: i64 = row.try_get_unchecked(i)?;
                match affinity {
                    Some(StorageAffinity::Boolean) => Value::Bool(v != 0),
                    Some(StorageAffinity::Temporal | StorageAffinity::Text) => {
                        Value::String(v.to_string())
                    }
                    _ => Value::from(v),
                }
            }
            Some("REAL" | "FLOAT" | "DOUBLE" | "NUMERIC") => {
                let v: f64 = row.try_get_unchecked(i)?;
                match affinity {
                    Some(StorageAffinity::Temporal | StorageAffinity::Text) => {
                        Value::String(v.to_string())
                    }
                    _ => serde_json::Number::from_f64(v)
                        .map(Value::Number)
                        .unwrap_or(Value::Null),
                }
            }
            Some("BLOB") => {
                let bytes: Vec<u8> = row.try_get_unchecked(i)?;
                blob_to_value(bytes, affinity)
            }
            Some(_) => {
                let text: String = row.try_get_unchecked(i)?;
                Value::String(text)
            }
        };

        record.insert(name.to_string(), value);
    }

    Ok(record)
}

/// Text-like columns decode blobs as (lossy) UTF-8; anything else keeps the bytes.
fn blob_to_value(bytes: Vec<u8>, affinity: Option<StorageAffinity>) -> Value {
    match affinity {
        Some(StorageAffinity::Text | StorageAffinity::Temporal) | None => {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        }
        Some(StorageAffinity::Integer | StorageAffinity::Boolean) => {
            Value::Array(bytes.into_iter().map(Value::from).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDefinition, ModelDefinition, SchemaDefinition};
    use serde_json::json;

    fn schema() -> Schema {
        SchemaDefinition::new()
            .model(
                "Account",
                ModelDefinition::new()
                    .field(FieldDefinition::new("id", FieldType::Id))
                    .field(FieldDefinition::new("login", FieldType::Text).required())
                    .field(FieldDefinition::new("password", FieldType::Password)),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_strip_blank_passwords() {
        let schema = schema();
        let model = schema.model("Account").unwrap();

        for blank in [json!(null), json!("")] {
            let mut payload = json!({"login": "ann", "password": blank})
                .as_object()
                .unwrap()
                .clone();
            strip_blank_passwords(model, &mut payload);
            assert!(!payload.contains_key("password"));
            assert!(payload.contains_key("login"));
        }

        let mut payload = json!({"password": "s3cret"}).as_object().unwrap().clone();
        strip_blank_passwords(model, &mut payload);
        assert_eq!(payload.get("password"), Some(&json!("s3cret")));
    }

    #[test]
    fn test_strip_keeps_blank_non_password() {
        let schema = schema();
        let model = schema.model("Account").unwrap();
        let mut payload = json!({"login": "", "ghost": null}).as_object().unwrap().clone();
        strip_blank_passwords(model, &mut payload);
        assert_eq!(payload.len(), 2);
    }

    #[test]
    fn test_blob_decoding_follows_affinity() {
        assert_eq!(
            blob_to_value(b"caf\xc3\xa9".to_vec(), Some(StorageAffinity::Text)),
            json!("caf\u{e9}")
        );
        assert_eq!(
            blob_to_value(b"2024-01-01".to_vec(), Some(StorageAffinity::Temporal)),
            json!("2024-01-01")
        );
        assert_eq!(
            blob_to_value(vec![0xff, 0x00], Some(StorageAffinity::Integer)),
            json!([255, 0])
        );
    }
}
