//! Field type catalog
//!
//! The closed set of semantic field types, their storage affinities and the
//! validation rule family each one belongs to. Every per-type decision in the
//! crate goes through an exhaustive `match` in this module, so adding a variant
//! fails to compile until storage mapping, validation and search defaults are
//! all decided for it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// Field Types
// ============================================================================

/// Semantic type of a model field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Boolean,
    Datetime,
    Date,
    Time,
    /// Auto-incrementing integer identifier
    Id,
    Email,
    Password,
    Phone,
    Url,
    Slug,
    Enum,
    Color,
    File,
    Image,
    Markdown,
    Json,
    Array,
    Relation,
    Currency,
    Location,
    Ip,
    Uuid,
    Duration,
}

/// Coarse column type a field maps to in storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageAffinity {
    Integer,
    Text,
    Boolean,
    Temporal,
}

/// Validation rule family applied to a field's values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeRule {
    /// String with optional length bounds and pattern
    Text,
    /// Numeric scalar with optional range bounds
    Number,
    Boolean,
    Email,
    Url,
    /// String drawn from the field's declared options
    Enum,
    /// String; format is left to storage
    Temporal,
    /// Only required/nullable are checked
    Unchecked,
}

impl FieldType {
    pub const ALL: [FieldType; 25] = [
        FieldType::Text,
        FieldType::Number,
        FieldType::Boolean,
        FieldType::Datetime,
        FieldType::Date,
        FieldType::Time,
        FieldType::Id,
        FieldType::Email,
        FieldType::Password,
        FieldType::Phone,
        FieldType::Url,
        FieldType::Slug,
        FieldType::Enum,
        FieldType::Color,
        FieldType::File,
        FieldType::Image,
        FieldType::Markdown,
        FieldType::Json,
        FieldType::Array,
        FieldType::Relation,
        FieldType::Currency,
        FieldType::Location,
        FieldType::Ip,
        FieldType::Uuid,
        FieldType::Duration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Datetime => "datetime",
            FieldType::Date => "date",
            FieldType::Time => "time",
            FieldType::Id => "id",
            FieldType::Email => "email",
            FieldType::Password => "password",
            FieldType::Phone => "phone",
            FieldType::Url => "url",
            FieldType::Slug => "slug",
            FieldType::Enum => "enum",
            FieldType::Color => "color",
            FieldType::File => "file",
            FieldType::Image => "image",
            FieldType::Markdown => "markdown",
            FieldType::Json => "json",
            FieldType::Array => "array",
            FieldType::Relation => "relation",
            FieldType::Currency => "currency",
            FieldType::Location => "location",
            FieldType::Ip => "ip",
            FieldType::Uuid => "uuid",
            FieldType::Duration => "duration",
        }
    }

    /// Storage affinity used for column declarations and value binding
    pub fn affinity(&self) -> StorageAffinity {
        match self {
            FieldType::Id | FieldType::Number | FieldType::Relation => StorageAffinity::Integer,
            FieldType::Boolean => StorageAffinity::Boolean,
            FieldType::Datetime | FieldType::Date | FieldType::Time => StorageAffinity::Temporal,
            FieldType::Text
            | FieldType::Email
            | FieldType::Password
            | FieldType::Phone
            | FieldType::Url
            | FieldType::Slug
            | FieldType::Enum
            | FieldType::Color
            | FieldType::File
            | FieldType::Image
            | FieldType::Markdown
            | FieldType::Json
            | FieldType::Array
            | FieldType::Currency
            | FieldType::Location
            | FieldType::Ip
            | FieldType::Uuid
            | FieldType::Duration => StorageAffinity::Text,
        }
    }

    /// Validation rule family for values of this type
    pub fn rule(&self) -> TypeRule {
        match self {
            FieldType::Text | FieldType::Password => TypeRule::Text,
            FieldType::Number => TypeRule::Number,
            FieldType::Boolean => TypeRule::Boolean,
            FieldType::Email => TypeRule::Email,
            FieldType::Url => TypeRule::Url,
            FieldType::Enum => TypeRule::Enum,
            FieldType::Datetime | FieldType::Date | FieldType::Time => TypeRule::Temporal,
            FieldType::Id
            | FieldType::Phone
            | FieldType::Slug
            | FieldType::Color
            | FieldType::File
            | FieldType::Image
            | FieldType::Markdown
            | FieldType::Json
            | FieldType::Array
            | FieldType::Relation
            | FieldType::Currency
            | FieldType::Location
            | FieldType::Ip
            | FieldType::Uuid
            | FieldType::Duration => TypeRule::Unchecked,
        }
    }

    /// Whether the field joins free-text search when a model declares no list view
    pub fn searchable_by_default(&self) -> bool {
        matches!(self, FieldType::Text | FieldType::Email | FieldType::Number)
    }

    /// Whether the field is sortable when a model declares no list view
    pub fn sortable_by_default(&self) -> bool {
        !matches!(self, FieldType::File | FieldType::Image)
    }

    /// Whether the field is shown in list views when a model declares none
    pub fn listed_by_default(&self) -> bool {
        !matches!(self, FieldType::Password)
    }

    pub fn is_temporal(&self) -> bool {
        self.affinity() == StorageAffinity::Temporal
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for FieldType {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown field type '{}'", s))
    }
}

// ============================================================================
// Defaults and Relations
// ============================================================================

/// Column default declared on a field
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// A literal value encoded into the DDL
    Literal(serde_json::Value),
    /// Filled in by storage with the current timestamp at write time
    GeneratedAtWrite,
}

/// Foreign key action when the referenced row is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    Cascade,
    Restrict,
    SetNull,
}

impl OnDelete {
    pub fn as_sql(&self) -> &'static str {
        match self {
            OnDelete::Cascade => "CASCADE",
            OnDelete::Restrict => "RESTRICT",
            OnDelete::SetNull => "SET NULL",
        }
    }
}

impl FromStr for OnDelete {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cascade" => Ok(OnDelete::Cascade),
            "restrict" => Ok(OnDelete::Restrict),
            "set_null" | "set-null" => Ok(OnDelete::SetNull),
            other => Err(format!("unknown on_delete policy '{}'", other)),
        }
    }
}
