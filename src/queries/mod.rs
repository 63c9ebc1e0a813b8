use sea_query::{Alias, ColumnRef, Expr, IntoIden, Order, SimpleExpr, Value as SeaValue, Values};

use crate::error::RepositoryError;
use crate::types::FieldValue;

mod dml;
mod select;

pub use dml::{DeleteQuery, InsertManyQuery, InsertQuery, UpdateQuery};
pub use select::SelectQuery;

/// An opaque boolean expression over columns. Composed by callers with
/// [`column`] (or sea-query directly) and passed through unmodified; the
/// repository only conjoins filters with AND.
pub type Filter = SimpleExpr;

/// A backend-ready statement: SQL text plus positional parameters in the
/// crate's unified value shape. Built by a query object, consumed by an
/// executor, discarded after one call.
#[derive(Debug, Clone)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<FieldValue>,
}

impl BuiltQuery {
    pub(crate) fn from_parts(sql: String, values: Values) -> Result<Self, RepositoryError> {
        let params = values
            .into_iter()
            .map(FieldValue::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { sql, params })
    }
}

/// Start a filter expression on a named column.
///
/// ```rust
/// use sql_repository::queries::column;
///
/// let filter = column("price").eq(100);
/// # let _ = filter;
/// ```
#[must_use]
pub fn column(name: &str) -> Expr {
    Expr::col(Alias::new(name))
}

pub(crate) fn column_expr(name: &str) -> SimpleExpr {
    SimpleExpr::Column(ColumnRef::Column(Alias::new(name).into_iden()))
}

/// The explicit match-everything sentinel. `delete` with zero filters is an
/// error; passing exactly this filter deletes unconditionally.
#[must_use]
pub fn match_all() -> Filter {
    SimpleExpr::Value(SeaValue::Bool(Some(true)))
}

pub(crate) fn is_match_all(filter: &Filter) -> bool {
    *filter == match_all()
}

/// One sort key. Later keys in a slice of orders act as secondary sorts.
#[derive(Debug, Clone)]
pub struct OrderBy {
    pub(crate) expr: SimpleExpr,
    pub(crate) dir: Order,
}

impl OrderBy {
    #[must_use]
    pub fn asc(column: &str) -> Self {
        Self {
            expr: column_expr(column),
            dir: Order::Asc,
        }
    }

    #[must_use]
    pub fn desc(column: &str) -> Self {
        Self {
            expr: column_expr(column),
            dir: Order::Desc,
        }
    }

    /// Sort on an arbitrary expression.
    #[must_use]
    pub fn expr(expr: SimpleExpr, dir: Order) -> Self {
        Self { expr, dir }
    }
}
