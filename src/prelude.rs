//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::error::RepositoryError;
pub use crate::executor::{
    ConnectionExecutor, ExecOptions, PooledExecutor, QueryExecutor, SharedExecutor,
};
pub use crate::fake::FakeRepo;
pub use crate::queries::{
    BuiltQuery, DeleteQuery, Filter, InsertManyQuery, InsertQuery, OrderBy, SelectQuery,
    UpdateQuery, column, match_all,
};
pub use crate::record::{Record, require_column};
pub use crate::repository::Repository;
pub use crate::results::Row;
pub use crate::table::TableSpec;
pub use crate::types::{ColumnValues, FieldValue, column_value};
