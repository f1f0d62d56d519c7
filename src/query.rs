//! Query request types
//!
//! Includes Record, QueryParams, Filter, SortField and the paged listing
//! envelope. Everything here is built from untrusted input; field names are
//! checked against the schema when the statement is compiled.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One row, keyed by column name
pub type Record = serde_json::Map<String, Value>;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

const FILTER_PREFIX: &str = "filter.";

fn default_page() -> u32 {
    DEFAULT_PAGE
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_operator() -> String {
    "=".to_string()
}

// ============================================================================
// Sorting and Filtering
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    pub field: String,
    #[serde(default)]
    pub descending: bool,
}

impl SortField {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

/// Comparison applied by a [`Filter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Substring match, the value is wrapped in `%…%`
    Like,
    /// Membership in a list value
    In,
}

impl FilterOperator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "=",
            FilterOperator::Ne => "!=",
            FilterOperator::Gt => ">",
            FilterOperator::Gte => ">=",
            FilterOperator::Lt => "<",
            FilterOperator::Lte => "<=",
            FilterOperator::Like => "LIKE",
            FilterOperator::In => "IN",
        }
    }
}

impl FromStr for FilterOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "=" | "eq" => Ok(FilterOperator::Eq),
            "!=" | "ne" => Ok(FilterOperator::Ne),
            ">" | "gt" => Ok(FilterOperator::Gt),
            ">=" | "gte" => Ok(FilterOperator::Gte),
            "<" | "lt" => Ok(FilterOperator::Lt),
            "<=" | "lte" => Ok(FilterOperator::Lte),
            "like" => Ok(FilterOperator::Like),
            "in" => Ok(FilterOperator::In),
            _ => Err(format!("unknown filter operator '{}'", s)),
        }
    }
}

/// A single condition on one field.
///
/// The operator is kept as received and parsed at compile time, so an
/// unknown operator fails the request instead of being dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    #[serde(default = "default_operator")]
    pub operator: String,
    pub value: Value,
}

impl Filter {
    pub fn new(
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, "=", value)
    }

    pub fn like(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, "like", value)
    }

    pub fn is_in<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        Self::new(field, "in", Value::Array(values))
    }
}

// ============================================================================
// Query Parameters
// ============================================================================

/// Filtering, search, sort and pagination for a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryParams {
    /// 1-based page number
    #[serde(default = "default_page")]
    pub page: u32,
    /// Rows per page; 0 disables LIMIT/OFFSET
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub sort: Vec<SortField>,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
            sort: Vec::new(),
            filters: Vec::new(),
            search: None,
        }
    }
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Return every matching row
    pub fn unbounded(mut self) -> Self {
        self.page_size = 0;
        self
    }

    pub fn sort(mut self, sort: SortField) -> Self {
        self.sort.push(sort);
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    /// Rows skipped before the current page
    pub fn offset(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.page_size)
    }

    /// Search term, if one is set and non-empty
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.is_empty())
    }

    /// Parse URL query pairs.
    ///
    /// Recognized keys: `page`, `page_size` (1..=100), `sort=a,-b` (leading
    /// `-` sorts descending), `search`, and `filter.<field>=<value>` as an
    /// equality filter. Out-of-range or malformed page values keep their
    /// defaults. For repeated keys the first occurrence wins.
    ///
    /// ```
    /// use schemaforge::QueryParams;
    ///
    /// let params = QueryParams::from_query_pairs([
    ///     ("page", "2"),
    ///     ("sort", "name,-age"),
    ///     ("filter.role", "admin"),
    /// ]);
    /// assert_eq!(params.page, 2);
    /// assert_eq!(params.page_size, 20);
    /// assert!(params.sort[1].descending);
    /// assert_eq!(params.filters[0].field, "role");
    /// ```
    pub fn from_query_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut params = Self::default();
        let mut seen_page = false;
        let mut seen_page_size = false;
        let mut seen_sort = false;

        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                "page" if !seen_page => {
                    seen_page = true;
                    if let Ok(p) = value.parse::<u32>() {
                        if p > 0 {
                            params.page = p;
                        }
                    }
                }
                "page_size" if !seen_page_size => {
                    seen_page_size = true;
                    if let Ok(ps) = value.parse::<u32>() {
                        if (1..=MAX_PAGE_SIZE).contains(&ps) {
                            params.page_size = ps;
                        }
                    }
                }
                "sort" if !seen_sort => {
                    seen_sort = true;
                    params.sort = value
                        .split(',')
                        .filter(|s| !s.is_empty())
                        .map(|s| match s.strip_prefix('-') {
                            Some(field) => SortField::desc(field),
                            None => SortField::asc(s),
                        })
                        .collect();
                }
                "search" if params.search.is_none() => {
                    if !value.is_empty() {
                        params.search = Some(value.to_string());
                    }
                }
                _ => {
                    if let Some(field) = key.strip_prefix(FILTER_PREFIX) {
                        if !params.filters.iter().any(|f| f.field == field) {
                            params.filters.push(Filter::eq(field, value));
                        }
                    }
                }
            }
        }

        params
    }
}

// ============================================================================
// Paged Listing
// ============================================================================

/// Pagination metadata returned with a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub page: u32,
    pub page_size: u32,
    pub total_count: i64,
    pub total_pages: u32,
}

impl PageMeta {
    pub fn new(page: u32, page_size: u32, total_count: i64) -> Self {
        let total = u64::try_from(total_count).unwrap_or(0);
        let total_pages = if page_size == 0 {
            u32::from(total > 0)
        } else {
            let size = u64::from(page_size);
            u32::try_from(total.div_ceil(size)).unwrap_or(u32::MAX)
        };
        Self {
            page,
            page_size,
            total_count,
            total_pages,
        }
    }
}

/// One page of records plus totals for the same filter set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub data: Vec<Record>,
    pub meta: PageMeta,
}
