//! Error types for schema construction, validation, query compilation and execution

use thiserror::Error;

/// Errors raised while building a [`Schema`](crate::schema::Schema).
///
/// These are fatal at startup: a schema is either fully built or not built at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("model {model} has no fields")]
    NoFields { model: String },

    #[error("model {model} declares field {field} more than once")]
    DuplicateField { model: String, field: String },

    #[error("model {model} has no primary key")]
    MissingPrimaryKey { model: String },

    #[error("model {model} has multiple primary keys")]
    MultiplePrimaryKeys { model: String },

    #[error("invalid field type '{type_name}' for {model}.{field}")]
    UnknownFieldType {
        model: String,
        field: String,
        type_name: String,
    },

    #[error("enum field {model}.{field} must have options")]
    MissingEnumOptions { model: String, field: String },

    #[error("relation field {model}.{field} must specify 'to' model")]
    MissingRelationTarget { model: String, field: String },

    #[error("array field {model}.{field} must specify 'items' type")]
    MissingArrayItems { model: String, field: String },

    #[error("invalid on_delete policy '{policy}' for {model}.{field}")]
    InvalidOnDelete {
        model: String,
        field: String,
        policy: String,
    },

    #[error("field {model}.{field} has min > max")]
    MinExceedsMax { model: String, field: String },

    #[error("field {model}.{field} has an invalid pattern: {reason}")]
    InvalidPattern {
        model: String,
        field: String,
        reason: String,
    },

    #[error("{view} view of model {model} references unknown field {field}")]
    UnknownViewField {
        model: String,
        view: &'static str,
        field: String,
    },
}

/// A per-field validation failure, suitable for rendering next to a form input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn invalid_query(msg: impl Into<String>) -> Self {
        Self::InvalidQuery(msg.into())
    }

    pub fn model_not_found(msg: impl Into<String>) -> Self {
        Self::ModelNotFound(msg.into())
    }

    pub fn record_not_found(msg: impl Into<String>) -> Self {
        Self::RecordNotFound(msg.into())
    }

    /// True for failures caused by the request itself (bad payload, bad query,
    /// missing model or record). These are deterministic and never worth retrying.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::InvalidQuery(_)
                | Self::ModelNotFound(_)
                | Self::RecordNotFound(_)
        )
    }

    /// The offending field name for validation failures.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation(e) => Some(&e.field),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
