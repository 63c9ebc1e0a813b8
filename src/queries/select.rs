use sea_query::{Alias, PostgresQueryBuilder, Query, SimpleExpr};

use crate::error::RepositoryError;
use crate::table::TableSpec;

use super::{BuiltQuery, Filter, OrderBy};

/// A SELECT over one table: filters are conjoined with AND and applied before
/// ordering; orders apply in the given sequence. The column set defaults to
/// every column of the table unless explicit select expressions are given.
#[derive(Debug)]
pub struct SelectQuery<'a> {
    table: &'static TableSpec,
    filters: &'a [Filter],
    orders: &'a [OrderBy],
    select_exprs: Vec<SimpleExpr>,
}

impl<'a> SelectQuery<'a> {
    #[must_use]
    pub fn new(table: &'static TableSpec, filters: &'a [Filter], orders: &'a [OrderBy]) -> Self {
        Self {
            table,
            filters,
            orders,
            select_exprs: Vec::new(),
        }
    }

    /// Replace the default all-columns projection.
    #[must_use]
    pub fn select_exprs(mut self, exprs: Vec<SimpleExpr>) -> Self {
        self.select_exprs = exprs;
        self
    }

    /// Render the backend-ready expression.
    ///
    /// # Errors
    /// Returns a parameter conversion error if a bound value cannot be
    /// represented in the unified value shape.
    pub fn build(&self) -> Result<BuiltQuery, RepositoryError> {
        let mut stmt = Query::select();
        stmt.from(Alias::new(self.table.name));

        if self.select_exprs.is_empty() {
            stmt.columns(self.table.columns.iter().map(|column| Alias::new(*column)));
        } else {
            for expr in &self.select_exprs {
                stmt.expr(expr.clone());
            }
        }

        for filter in self.filters {
            stmt.and_where(filter.clone());
        }
        for order in self.orders {
            stmt.order_by_expr(order.expr.clone(), order.dir.clone());
        }

        let (sql, values) = stmt.build(PostgresQueryBuilder);
        BuiltQuery::from_parts(sql, values)
    }
}

#[cfg(test)]
mod tests {
    use crate::queries::{OrderBy, column};
    use crate::table::TableSpec;
    use crate::types::FieldValue;

    use super::*;

    static TRANSACTIONS: TableSpec = TableSpec {
        name: "transactions",
        columns: &["id", "date", "price"],
        id_column: "id",
        server_default_columns: &[],
    };

    #[test]
    fn selects_all_columns_by_default() {
        let built = SelectQuery::new(&TRANSACTIONS, &[], &[]).build().unwrap();
        assert_eq!(
            built.sql,
            r#"SELECT "id", "date", "price" FROM "transactions""#
        );
        assert!(built.params.is_empty());
    }

    #[test]
    fn filters_are_conjoined_and_precede_orders() {
        let filters = vec![column("price").eq(100), column("price").gt(0)];
        let orders = vec![OrderBy::asc("date"), OrderBy::desc("price")];
        let built = SelectQuery::new(&TRANSACTIONS, &filters, &orders)
            .build()
            .unwrap();
        assert_eq!(
            built.sql,
            r#"SELECT "id", "date", "price" FROM "transactions" WHERE "price" = $1 AND "price" > $2 ORDER BY "date" ASC, "price" DESC"#
        );
        assert_eq!(built.params, vec![FieldValue::Int(100), FieldValue::Int(0)]);
    }

    #[test]
    fn explicit_projection_replaces_columns() {
        let built = SelectQuery::new(&TRANSACTIONS, &[], &[])
            .select_exprs(vec![column("id").count()])
            .build()
            .unwrap();
        assert_eq!(built.sql, r#"SELECT COUNT("id") FROM "transactions""#);
    }
}
