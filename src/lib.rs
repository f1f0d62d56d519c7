//! # schemaforge
//!
//! A schema-driven SQLite persistence core.
//!
//! A declarative model description is built into an immutable [`Schema`]. From
//! it the crate synthesizes tables and indexes, validates create and update
//! payloads, and compiles filtered, searched, sorted and paginated queries into
//! parameterized statements.
//!
//! ## Features
//!
//! - **Closed Field Type Catalog**: every type maps to a storage affinity and a validation rule
//! - **Two-Phase DDL**: all tables first, then all indexes, every statement `IF NOT EXISTS`
//! - **Validation**: per-field type, length, range, pattern and enum checks, fail-fast
//! - **Query Compilation**: filters, free-text search, sort and pagination with bound values
//! - **SQL Injection Prevention**: identifiers are checked against the schema and quoted
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use schemaforge::{
//!     FieldDefinition, FieldType, Filter, ModelDefinition, QueryParams, SchemaDefinition, Store,
//!     StoreConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let schema = SchemaDefinition::new()
//!         .model(
//!             "User",
//!             ModelDefinition::new()
//!                 .field(FieldDefinition::new("id", FieldType::Id).primary())
//!                 .field(FieldDefinition::new("name", FieldType::Text).required().max(50))
//!                 .field(FieldDefinition::new("age", FieldType::Number).min(0).max(120)),
//!         )
//!         .build()?;
//!
//!     let store = Store::new(StoreConfig::builder("sqlite://app.db").build(), schema).await?;
//!     store.create_schema().await?;
//!
//!     let payload = serde_json::json!({"name": "Ann", "age": 30});
//!     let id = store
//!         .create("User", payload.as_object().cloned().unwrap_or_default())
//!         .await?;
//!     let ann = store.get("User", &id).await?;
//!
//!     let adults = store
//!         .query("User", &QueryParams::new().filter(Filter::new("age", ">=", 18)))
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use std::time::Duration;
//! use schemaforge::StoreConfig;
//!
//! let config = StoreConfig::builder("sqlite::memory:")
//!     .max_connections(1)                      // Default 5
//!     .foreign_keys(true)                      // Enforce FOREIGN KEY constraints (default)
//!     .busy_timeout(Duration::from_secs(2))    // Default 5s
//!     .build();
//! ```

pub mod config;
pub mod error;
pub mod query;
pub mod schema;
pub mod sql;
pub mod store;
pub mod types;
pub mod validation;

// Re-export main types for convenience
pub use config::{StoreConfig, StoreConfigBuilder};
pub use error::{Result, SchemaError, StoreError, ValidationError};
pub use query::{Filter, FilterOperator, Page, PageMeta, QueryParams, Record, SortField};
pub use schema::{
    Field, FieldDefinition, FormView, ListView, Model, ModelDefinition, Permissions, Relation,
    Schema, SchemaDefinition, UiDefinition, Verb,
};
pub use store::Store;
pub use types::{DefaultValue, FieldType, OnDelete, StorageAffinity, TypeRule};
pub use validation::Validator;

// Re-export SQL utilities for advanced users
pub use sql::builder::{QueryBuilder, Statement};
pub use sql::ddl::DdlGenerator;
pub use sql::dialect::{Dialect, quote_identifier};
