use sea_query::{Alias, PostgresQueryBuilder, Query, SimpleExpr};

use crate::error::RepositoryError;
use crate::table::TableSpec;
use crate::types::{ColumnValues, FieldValue};

use super::{BuiltQuery, Filter, column, is_match_all};

fn value_expr(value: &FieldValue) -> SimpleExpr {
    SimpleExpr::Value(value.clone().into())
}

/// A single-row INSERT with an optional RETURNING clause.
#[derive(Debug)]
pub struct InsertQuery<'a> {
    table: &'static TableSpec,
    payload: &'a ColumnValues,
    returning: &'a [String],
}

impl<'a> InsertQuery<'a> {
    #[must_use]
    pub fn new(
        table: &'static TableSpec,
        payload: &'a ColumnValues,
        returning: &'a [String],
    ) -> Self {
        Self {
            table,
            payload,
            returning,
        }
    }

    /// Render the backend-ready expression.
    ///
    /// # Errors
    /// Returns a parameter conversion error when the payload cannot be bound.
    pub fn build(&self) -> Result<BuiltQuery, RepositoryError> {
        let mut stmt = Query::insert();
        stmt.into_table(Alias::new(self.table.name));

        if self.payload.is_empty() {
            // Every column deferred to the store; an empty column list would
            // not parse.
            stmt.or_default_values();
        } else {
            stmt.columns(self.payload.iter().map(|(column, _)| Alias::new(column.as_str())));
            stmt.values(self.payload.iter().map(|(_, value)| value_expr(value)))
                .map_err(|e| RepositoryError::ParameterError(e.to_string()))?;
        }

        if !self.returning.is_empty() {
            stmt.returning(
                Query::returning()
                    .columns(self.returning.iter().map(|column| Alias::new(column.as_str()))),
            );
        }

        let (sql, values) = stmt.build(PostgresQueryBuilder);
        BuiltQuery::from_parts(sql, values)
    }
}

/// A multi-row INSERT. All rows share one column list; the executor returns
/// one RETURNING row per inserted record, order-preserving.
#[derive(Debug)]
pub struct InsertManyQuery<'a> {
    table: &'static TableSpec,
    columns: &'a [String],
    rows: &'a [Vec<FieldValue>],
    returning: &'a [String],
}

impl<'a> InsertManyQuery<'a> {
    #[must_use]
    pub fn new(
        table: &'static TableSpec,
        columns: &'a [String],
        rows: &'a [Vec<FieldValue>],
        returning: &'a [String],
    ) -> Self {
        Self {
            table,
            columns,
            rows,
            returning,
        }
    }

    /// Render the backend-ready expression.
    ///
    /// # Errors
    /// Returns a parameter conversion error when a row's width does not match
    /// the column list or a value cannot be bound.
    pub fn build(&self) -> Result<BuiltQuery, RepositoryError> {
        let mut stmt = Query::insert();
        stmt.into_table(Alias::new(self.table.name));

        if self.columns.is_empty() && !self.rows.is_empty() {
            // Every column deferred across the whole batch: one DEFAULT row
            // per record.
            let row_count = u32::try_from(self.rows.len())
                .map_err(|e| RepositoryError::ParameterError(e.to_string()))?;
            stmt.or_default_values_many(row_count);
        } else {
            stmt.columns(self.columns.iter().map(|column| Alias::new(column.as_str())));

            for row in self.rows {
                stmt.values(row.iter().map(value_expr))
                    .map_err(|e| RepositoryError::ParameterError(e.to_string()))?;
            }
        }

        if !self.returning.is_empty() {
            stmt.returning(
                Query::returning()
                    .columns(self.returning.iter().map(|column| Alias::new(column.as_str()))),
            );
        }

        let (sql, values) = stmt.build(PostgresQueryBuilder);
        BuiltQuery::from_parts(sql, values)
    }
}

/// An UPDATE of the named columns on rows matching the filters.
#[derive(Debug)]
pub struct UpdateQuery<'a> {
    table: &'static TableSpec,
    payload: &'a ColumnValues,
    filters: Vec<Filter>,
}

impl<'a> UpdateQuery<'a> {
    #[must_use]
    pub fn new(table: &'static TableSpec, payload: &'a ColumnValues, filters: Vec<Filter>) -> Self {
        Self {
            table,
            payload,
            filters,
        }
    }

    /// Update the row whose identifier equals `id`.
    #[must_use]
    pub fn by_id(id: i64, table: &'static TableSpec, payload: &'a ColumnValues) -> Self {
        let filter = column(table.id_column).eq(id);
        Self::new(table, payload, vec![filter])
    }

    /// Render the backend-ready expression.
    ///
    /// # Errors
    /// Returns a parameter conversion error when the payload cannot be bound.
    pub fn build(&self) -> Result<BuiltQuery, RepositoryError> {
        let mut stmt = Query::update();
        stmt.table(Alias::new(self.table.name));
        for (column, value) in self.payload {
            stmt.value(Alias::new(column.as_str()), value_expr(value));
        }
        for filter in &self.filters {
            stmt.and_where(filter.clone());
        }

        let (sql, values) = stmt.build(PostgresQueryBuilder);
        BuiltQuery::from_parts(sql, values)
    }
}

/// A DELETE of rows matching the filters.
///
/// Zero filters is an error so unconditional deletion is always an explicit
/// decision; a single [`match_all`](super::match_all) sentinel deletes every
/// row.
#[derive(Debug)]
pub struct DeleteQuery<'a> {
    table: &'static TableSpec,
    filters: &'a [Filter],
}

impl<'a> DeleteQuery<'a> {
    #[must_use]
    pub fn new(table: &'static TableSpec, filters: &'a [Filter]) -> Self {
        Self { table, filters }
    }

    /// Render the backend-ready expression.
    ///
    /// # Errors
    /// Returns [`RepositoryError::MissingFilterError`] when no filters were
    /// given.
    pub fn build(&self) -> Result<BuiltQuery, RepositoryError> {
        if self.filters.is_empty() {
            return Err(RepositoryError::MissingFilterError);
        }

        let unconditional = self.filters.len() == 1 && is_match_all(&self.filters[0]);

        let mut stmt = Query::delete();
        stmt.from_table(Alias::new(self.table.name));
        if !unconditional {
            for filter in self.filters {
                stmt.and_where(filter.clone());
            }
        }

        let (sql, values) = stmt.build(PostgresQueryBuilder);
        BuiltQuery::from_parts(sql, values)
    }
}

#[cfg(test)]
mod tests {
    use crate::queries::{column, match_all};

    use super::*;

    static TRANSACTIONS: TableSpec = TableSpec {
        name: "transactions",
        columns: &["id", "date", "price"],
        id_column: "id",
        server_default_columns: &[],
    };

    static COUNTERS: TableSpec = TableSpec {
        name: "counters",
        columns: &["id", "position"],
        id_column: "id",
        server_default_columns: &["position"],
    };

    #[test]
    fn insert_renders_returning_columns() {
        let payload: ColumnValues = vec![("price".into(), FieldValue::Int(100))];
        let returning = vec!["id".to_string()];
        let built = InsertQuery::new(&TRANSACTIONS, &payload, &returning)
            .build()
            .unwrap();
        assert_eq!(
            built.sql,
            r#"INSERT INTO "transactions" ("price") VALUES ($1) RETURNING "id""#
        );
        assert_eq!(built.params, vec![FieldValue::Int(100)]);
    }

    #[test]
    fn insert_with_empty_payload_renders_default_values() {
        let payload: ColumnValues = vec![];
        let returning = vec!["id".to_string(), "position".to_string()];
        let built = InsertQuery::new(&COUNTERS, &payload, &returning)
            .build()
            .unwrap();
        assert_eq!(
            built.sql,
            r#"INSERT INTO "counters" VALUES (DEFAULT) RETURNING "id", "position""#
        );
        assert!(built.params.is_empty());
    }

    #[test]
    fn insert_many_with_no_columns_renders_default_rows() {
        let rows: Vec<Vec<FieldValue>> = vec![vec![], vec![]];
        let returning = vec!["id".to_string(), "position".to_string()];
        let built = InsertManyQuery::new(&COUNTERS, &[], &rows, &returning)
            .build()
            .unwrap();
        assert_eq!(
            built.sql,
            r#"INSERT INTO "counters" VALUES (DEFAULT), (DEFAULT) RETURNING "id", "position""#
        );
        assert!(built.params.is_empty());
    }

    #[test]
    fn insert_many_binds_rows_in_order() {
        let columns = vec!["price".to_string()];
        let rows = vec![vec![FieldValue::Int(1)], vec![FieldValue::Int(2)]];
        let returning = vec!["id".to_string()];
        let built = InsertManyQuery::new(&TRANSACTIONS, &columns, &rows, &returning)
            .build()
            .unwrap();
        assert_eq!(
            built.sql,
            r#"INSERT INTO "transactions" ("price") VALUES ($1), ($2) RETURNING "id""#
        );
        assert_eq!(built.params, vec![FieldValue::Int(1), FieldValue::Int(2)]);
    }

    #[test]
    fn update_by_id_restricts_to_identifier() {
        let payload: ColumnValues = vec![("price".into(), FieldValue::Int(7))];
        let built = UpdateQuery::by_id(3, &TRANSACTIONS, &payload).build().unwrap();
        assert_eq!(
            built.sql,
            r#"UPDATE "transactions" SET "price" = $1 WHERE "id" = $2"#
        );
        assert_eq!(built.params, vec![FieldValue::Int(7), FieldValue::Int(3)]);
    }

    #[test]
    fn delete_without_filters_is_rejected() {
        let err = DeleteQuery::new(&TRANSACTIONS, &[]).build().unwrap_err();
        assert!(matches!(err, RepositoryError::MissingFilterError));
    }

    #[test]
    fn delete_match_all_drops_the_where_clause() {
        let filters = vec![match_all()];
        let built = DeleteQuery::new(&TRANSACTIONS, &filters).build().unwrap();
        assert_eq!(built.sql, r#"DELETE FROM "transactions""#);
        assert!(built.params.is_empty());
    }

    #[test]
    fn delete_with_filter_keeps_the_where_clause() {
        let filters = vec![column("price").eq(100)];
        let built = DeleteQuery::new(&TRANSACTIONS, &filters).build().unwrap();
        assert_eq!(
            built.sql,
            r#"DELETE FROM "transactions" WHERE "price" = $1"#
        );
    }
}
