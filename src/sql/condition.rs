//! Condition building for SQL WHERE and ORDER BY clauses
//!
//! Every referenced field is looked up in the model before its name reaches
//! SQL text. Values are never interpolated: each one is pushed onto `args`
//! and replaced by the dialect's placeholder.

use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::query::{Filter, FilterOperator, SortField};
use crate::schema::{Field, Model};
use crate::sql::dialect::Dialect;
use crate::sql::value::SqlValue;

/// Push a bound value and return its placeholder
pub(crate) fn bind(dialect: &dyn Dialect, args: &mut Vec<SqlValue>, value: SqlValue) -> String {
    args.push(value);
    dialect.placeholder(args.len())
}

fn filter_field<'m>(model: &'m Model, name: &str) -> Result<&'m Field> {
    model.field(name).ok_or_else(|| {
        StoreError::invalid_query(format!(
            "unknown filter field '{}' on model {}",
            name, model.name
        ))
    })
}

fn like_pattern(value: &Value) -> String {
    match value {
        Value::String(s) => format!("%{}%", escape_like(s)),
        other => format!("%{}%", escape_like(&other.to_string())),
    }
}

/// Escape LIKE wildcards so the term matches literally under `ESCAPE '\'`
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Build the clause for one filter
pub fn build_filter_clause(
    dialect: &dyn Dialect,
    model: &Model,
    filter: &Filter,
    args: &mut Vec<SqlValue>,
) -> Result<String> {
    let field = filter_field(model, &filter.field)?;
    let operator: FilterOperator = filter
        .operator
        .parse()
        .map_err(StoreError::invalid_query)?;
    let column = dialect.quote_identifier(&field.name);

    match operator {
        FilterOperator::Like => {
            let placeholder = bind(dialect, args, SqlValue::Text(like_pattern(&filter.value)));
            Ok(format!(r"{} LIKE {} ESCAPE '\'", column, placeholder))
        }
        FilterOperator::In => {
            let values = filter.value.as_array().ok_or_else(|| {
                StoreError::invalid_query(format!(
                    "'in' filter on '{}' requires a list value",
                    field.name
                ))
            })?;
            if values.is_empty() {
                return Ok("1 = 0".to_string());
            }
            let placeholders: Vec<String> = values
                .iter()
                .map(|v| bind(dialect, args, SqlValue::for_field(field, v)))
                .collect();
            Ok(format!("{} IN ({})", column, placeholders.join(", ")))
        }
        FilterOperator::Eq
        | FilterOperator::Ne
        | FilterOperator::Gt
        | FilterOperator::Gte
        | FilterOperator::Lt
        | FilterOperator::Lte => {
            if filter.value.is_null() {
                return match operator {
                    FilterOperator::Eq => Ok(format!("{} IS NULL", column)),
                    FilterOperator::Ne => Ok(format!("{} IS NOT NULL", column)),
                    _ => Err(StoreError::invalid_query(format!(
                        "operator '{}' cannot compare '{}' with null",
                        operator.as_sql(),
                        field.name
                    ))),
                };
            }
            let placeholder = bind(dialect, args, SqlValue::for_field(field, &filter.value));
            Ok(format!("{} {} {}", column, operator.as_sql(), placeholder))
        }
    }
}

/// Build the free-text search group: one LIKE per searchable field, ORed.
///
/// Returns `None` when the model has no searchable fields.
pub fn build_search_clause(
    dialect: &dyn Dialect,
    model: &Model,
    term: &str,
    args: &mut Vec<SqlValue>,
) -> Option<String> {
    let pattern = format!("%{}%", escape_like(term));
    let clauses: Vec<String> = model
        .searchable_fields()
        .map(|field| {
            let placeholder = bind(dialect, args, SqlValue::Text(pattern.clone()));
            format!(
                r"{} LIKE {} ESCAPE '\'",
                dialect.quote_identifier(&field.name),
                placeholder
            )
        })
        .collect();

    if clauses.is_empty() {
        None
    } else {
        Some(format!("({})", clauses.join(" OR ")))
    }
}

/// Build the WHERE body shared by SELECT and COUNT.
///
/// Filters are ANDed; the search group, if any, narrows them. Returns `None`
/// when there is nothing to filter on.
pub fn build_where_clause(
    dialect: &dyn Dialect,
    model: &Model,
    filters: &[Filter],
    search: Option<&str>,
    args: &mut Vec<SqlValue>,
) -> Result<Option<String>> {
    let mut clauses = Vec::with_capacity(filters.len() + 1);
    for filter in filters {
        clauses.push(build_filter_clause(dialect, model, filter, args)?);
    }
    if let Some(term) = search.filter(|t| !t.is_empty()) {
        if let Some(group) = build_search_clause(dialect, model, term, args) {
            clauses.push(group);
        }
    }

    if clauses.is_empty() {
        Ok(None)
    } else {
        Ok(Some(clauses.join(" AND ")))
    }
}

/// Build the ORDER BY body.
///
/// Orders by the primary key descending when no sort is given, and appends
/// it as the final tie-breaker otherwise, so LIMIT/OFFSET pages never overlap.
pub fn build_order_by_clause(
    dialect: &dyn Dialect,
    model: &Model,
    sort: &[SortField],
) -> Result<String> {
    let primary = &model.primary_field().name;
    let mut order_parts = Vec::with_capacity(sort.len() + 1);
    let mut has_primary = false;

    for s in sort {
        let field = model.field(&s.field).ok_or_else(|| {
            StoreError::invalid_query(format!(
                "unknown sort field '{}' on model {}",
                s.field, model.name
            ))
        })?;
        has_primary |= field.name == *primary;
        let direction = if s.descending { "DESC" } else { "ASC" };
        order_parts.push(format!(
            "{} {}",
            dialect.quote_identifier(&field.name),
            direction
        ));
    }

    if !has_primary {
        order_parts.push(format!("{} DESC", dialect.quote_identifier(primary)));
    }

    Ok(order_parts.join(", "))
}
