//! SQL utilities for Store
//!
//! Provides the dialect boundary, statement compilation and DDL generation.

pub mod builder;
pub mod condition;
pub mod ddl;
pub mod dialect;
pub mod value;

pub use builder::{QueryBuilder, Statement};
pub use condition::{
    build_filter_clause, build_order_by_clause, build_search_clause, build_where_clause,
};
pub use ddl::DdlGenerator;
pub use dialect::{Dialect, Sqlite, quote_identifier, quote_literal};
pub use value::SqlValue;
