//! Schema model
//!
//! `SchemaDefinition` / `ModelDefinition` / `FieldDefinition` are the
//! deserializable input handed over by the configuration layer. `Schema::build`
//! turns them into the immutable `Schema` / `Model` / `Field` form used by the
//! validator, the query compiler and the DDL generator. Building is
//! all-or-nothing: the first violation aborts with a `SchemaError` naming the
//! model and field.

use std::collections::{BTreeMap, HashSet};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{SchemaError, StoreError};
use crate::types::{DefaultValue, FieldType, OnDelete};

/// Maximum number of list columns generated for a model without a list view
const DEFAULT_LIST_COLUMNS: usize = 5;

// ============================================================================
// Definitions (configuration input)
// ============================================================================

/// Field as declared in configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,

    /// Field type name, checked against the catalog at build time
    #[serde(rename = "type")]
    pub field_type: String,

    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub index: bool,

    /// Lower bound: string length for text fields, value for numbers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    /// Upper bound: string length for text fields, value for numbers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,

    #[serde(default)]
    pub auto_now: bool,
    #[serde(default)]
    pub auto_now_add: bool,

    /// Target model of a relation field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// `cascade`, `restrict` or `set_null`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<String>,
    /// Element type of an array field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<String>,
}

impl FieldDefinition {
    /// Create a new field definition with a name and type
    pub fn new(name: impl Into<String>, field_type: impl AsRef<str>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.as_ref().to_string(),
            ..Default::default()
        }
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn indexed(mut self) -> Self {
        self.index = true;
        self
    }

    pub fn min(mut self, min: i64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: i64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn default_value(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Stamp the current time on every write
    pub fn auto_now(mut self) -> Self {
        self.auto_now = true;
        self
    }

    /// Stamp the current time on insert
    pub fn auto_now_add(mut self) -> Self {
        self.auto_now_add = true;
        self
    }

    pub fn relation_to(mut self, model: impl Into<String>) -> Self {
        self.to = Some(model.into());
        self
    }

    pub fn on_delete(mut self, policy: impl Into<String>) -> Self {
        self.on_delete = Some(policy.into());
        self
    }

    pub fn items(mut self, element_type: impl AsRef<str>) -> Self {
        self.items = Some(element_type.as_ref().to_string());
        self
    }
}

/// List view projection: displayed columns, sortable and searchable fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListView {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub sortable: Vec<String>,
    #[serde(default)]
    pub searchable: Vec<String>,
}

/// Form projection: editable fields in display order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormView {
    #[serde(default)]
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<ListView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<FormView>,
}

/// CRUD verb a permission policy applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Create,
    Read,
    Update,
    Delete,
}

/// One policy token per CRUD verb, evaluated by the external auth layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub create: String,
    pub read: String,
    pub update: String,
    pub delete: String,
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            create: "authenticated".to_string(),
            read: "all".to_string(),
            update: "authenticated".to_string(),
            delete: "authenticated".to_string(),
        }
    }
}

impl Permissions {
    pub fn policy(&self, verb: Verb) -> &str {
        match verb {
            Verb::Create => &self.create,
            Verb::Read => &self.read,
            Verb::Update => &self.update,
            Verb::Delete => &self.delete,
        }
    }
}

/// Model as declared in configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelDefinition {
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui: Option<UiDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,
}

impl ModelDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_list(mut self, list: ListView) -> Self {
        self.ui.get_or_insert_with(UiDefinition::default).list = Some(list);
        self
    }

    pub fn with_form(mut self, form: FormView) -> Self {
        self.ui.get_or_insert_with(UiDefinition::default).form = Some(form);
        self
    }

    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = Some(permissions);
        self
    }
}

/// All models of an application, keyed by model name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    #[serde(default)]
    pub models: BTreeMap<String, ModelDefinition>,
}

impl SchemaDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(mut self, name: impl Into<String>, model: ModelDefinition) -> Self {
        self.models.insert(name.into(), model);
        self
    }

    pub fn build(&self) -> Result<Schema, SchemaError> {
        Schema::build(self)
    }
}

// ============================================================================
// Built Schema
// ============================================================================

/// Relation target and delete policy of a relation field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub to: String,
    pub on_delete: Option<OnDelete>,
}

/// One column of a model
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
    pub primary: bool,
    pub required: bool,
    pub unique: bool,
    pub nullable: bool,
    pub index: bool,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub pattern: Option<Regex>,
    pub options: Vec<String>,
    pub default: Option<DefaultValue>,
    pub auto_now: bool,
    pub auto_now_add: bool,
    pub relation: Option<Relation>,
    pub items: Option<FieldType>,
}

impl Field {
    /// Primary key whose value storage generates
    pub fn is_identifier(&self) -> bool {
        self.primary && self.field_type == FieldType::Id
    }

    /// Whether phase 2 of DDL synthesis creates a standalone index for this field
    pub fn needs_index(&self) -> bool {
        (self.index || self.relation.is_some()) && !self.primary && !self.unique
    }
}

/// A named entity type, stored as one table
#[derive(Debug, Clone)]
pub struct Model {
    pub name: String,
    fields: Vec<Field>,
    pub list: ListView,
    pub form: FormView,
    pub permissions: Permissions,
    primary: usize,
}

impl Model {
    /// Fields in declaration order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn primary_field(&self) -> &Field {
        &self.fields[self.primary]
    }

    /// Fields included in free-text search, in declaration order of the list view
    pub fn searchable_fields(&self) -> impl Iterator<Item = &Field> {
        self.list.searchable.iter().filter_map(|name| self.field(name))
    }
}

/// Immutable set of models, built once at startup
#[derive(Debug, Clone, Default)]
pub struct Schema {
    models: BTreeMap<String, Model>,
}

impl Schema {
    /// Build and check a schema from its definition
    pub fn build(definition: &SchemaDefinition) -> Result<Self, SchemaError> {
        let mut models = BTreeMap::new();
        for (name, model_def) in &definition.models {
            models.insert(name.clone(), build_model(name, model_def)?);
        }
        Ok(Self { models })
    }

    pub fn model(&self, name: &str) -> Option<&Model> {
        self.models.get(name)
    }

    /// Like [`Schema::model`], failing with `ModelNotFound`
    pub fn require_model(&self, name: &str) -> Result<&Model, StoreError> {
        self.model(name)
            .ok_or_else(|| StoreError::model_not_found(name))
    }

    pub fn field(&self, model: &str, field: &str) -> Option<&Field> {
        self.model(model).and_then(|m| m.field(field))
    }

    /// Models in name order
    pub fn models(&self) -> impl Iterator<Item = &Model> {
        self.models.values()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

fn build_model(name: &str, def: &ModelDefinition) -> Result<Model, SchemaError> {
    if def.fields.is_empty() {
        return Err(SchemaError::NoFields {
            model: name.to_string(),
        });
    }

    let mut seen = HashSet::new();
    let mut fields = Vec::with_capacity(def.fields.len());
    let mut primary = None;

    for field_def in &def.fields {
        if !seen.insert(field_def.name.as_str()) {
            return Err(SchemaError::DuplicateField {
                model: name.to_string(),
                field: field_def.name.clone(),
            });
        }

        let field = build_field(name, field_def)?;
        if field.primary {
            if primary.is_some() {
                return Err(SchemaError::MultiplePrimaryKeys {
                    model: name.to_string(),
                });
            }
            primary = Some(fields.len());
        }
        fields.push(field);
    }

    let primary = primary.ok_or_else(|| SchemaError::MissingPrimaryKey {
        model: name.to_string(),
    })?;

    let ui = def.ui.clone().unwrap_or_default();
    let list = match ui.list {
        Some(list) => list,
        None => default_list_view(&fields),
    };
    let form = match ui.form {
        Some(form) => form,
        None => default_form_view(&fields),
    };

    let model = Model {
        name: name.to_string(),
        fields,
        list,
        form,
        permissions: def.permissions.clone().unwrap_or_default(),
        primary,
    };
    check_views(&model)?;

    Ok(model)
}

fn build_field(model: &str, def: &FieldDefinition) -> Result<Field, SchemaError> {
    let field_type: FieldType =
        def.field_type
            .parse()
            .map_err(|_| SchemaError::UnknownFieldType {
                model: model.to_string(),
                field: def.name.clone(),
                type_name: def.field_type.clone(),
            })?;

    if field_type == FieldType::Enum && def.options.is_empty() {
        return Err(SchemaError::MissingEnumOptions {
            model: model.to_string(),
            field: def.name.clone(),
        });
    }

    let relation = if field_type == FieldType::Relation {
        let to = def
            .to
            .as_deref()
            .filter(|to| !to.is_empty())
            .ok_or_else(|| SchemaError::MissingRelationTarget {
                model: model.to_string(),
                field: def.name.clone(),
            })?;
        let on_delete = def
            .on_delete
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(|p| {
                p.parse::<OnDelete>()
                    .map_err(|_| SchemaError::InvalidOnDelete {
                        model: model.to_string(),
                        field: def.name.clone(),
                        policy: p.to_string(),
                    })
            })
            .transpose()?;
        Some(Relation {
            to: to.to_string(),
            on_delete,
        })
    } else {
        None
    };

    let items = if field_type == FieldType::Array {
        let items = def
            .items
            .as_deref()
            .filter(|i| !i.is_empty())
            .ok_or_else(|| SchemaError::MissingArrayItems {
                model: model.to_string(),
                field: def.name.clone(),
            })?;
        Some(
            items
                .parse::<FieldType>()
                .map_err(|_| SchemaError::UnknownFieldType {
                    model: model.to_string(),
                    field: def.name.clone(),
                    type_name: items.to_string(),
                })?,
        )
    } else {
        None
    };

    if let (Some(min), Some(max)) = (def.min, def.max) {
        if min > max {
            return Err(SchemaError::MinExceedsMax {
                model: model.to_string(),
                field: def.name.clone(),
            });
        }
    }

    let pattern = def
        .pattern
        .as_deref()
        .filter(|p| !p.is_empty())
        .map(|p| {
            Regex::new(p).map_err(|e| SchemaError::InvalidPattern {
                model: model.to_string(),
                field: def.name.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()?;

    // An id field is always the primary key, and a primary key is always required and unique
    let primary = def.primary || field_type == FieldType::Id;

    let default = if field_type.is_temporal() && (def.auto_now || def.auto_now_add) {
        Some(DefaultValue::GeneratedAtWrite)
    } else {
        def.default.clone().map(DefaultValue::Literal)
    };

    Ok(Field {
        name: def.name.clone(),
        field_type,
        primary,
        required: def.required || primary,
        unique: def.unique || primary,
        nullable: def.nullable,
        index: def.index,
        min: def.min,
        max: def.max,
        pattern,
        options: def.options.clone(),
        default,
        auto_now: def.auto_now,
        auto_now_add: def.auto_now_add,
        relation,
        items,
    })
}

fn default_list_view(fields: &[Field]) -> ListView {
    let mut list = ListView::default();
    for field in fields {
        if field.primary || !field.field_type.listed_by_default() {
            continue;
        }
        list.columns.push(field.name.clone());
        if field.field_type.searchable_by_default() {
            list.searchable.push(field.name.clone());
        }
        if field.field_type.sortable_by_default() {
            list.sortable.push(field.name.clone());
        }
    }
    list.columns.truncate(DEFAULT_LIST_COLUMNS);
    list
}

fn default_form_view(fields: &[Field]) -> FormView {
    FormView {
        fields: fields
            .iter()
            .filter(|f| !f.primary && !f.auto_now && !f.auto_now_add)
            .map(|f| f.name.clone())
            .collect(),
    }
}

fn check_views(model: &Model) -> Result<(), SchemaError> {
    let views: [(&'static str, &[String]); 4] = [
        ("list columns", &model.list.columns),
        ("list sortable", &model.list.sortable),
        ("list searchable", &model.list.searchable),
        ("form", &model.form.fields),
    ];
    for (view, names) in views {
        if let Some(unknown) = names.iter().find(|n| !model.has_field(n)) {
            return Err(SchemaError::UnknownViewField {
                model: model.name.clone(),
                view,
                field: unknown.clone(),
            });
        }
    }
    Ok(())
}
