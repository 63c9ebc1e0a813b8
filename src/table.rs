/// Static description of the relation a record type maps to.
///
/// Owned by application code (usually as a `static`); repositories hold a
/// reference and never mutate it.
///
/// ```rust
/// use sql_repository::TableSpec;
///
/// static TRANSACTIONS: TableSpec = TableSpec {
///     name: "transactions",
///     columns: &["id", "date", "price"],
///     id_column: "id",
///     server_default_columns: &[],
/// };
/// # let _ = &TRANSACTIONS;
/// ```
#[derive(Debug)]
pub struct TableSpec {
    /// Physical relation name.
    pub name: &'static str,
    /// Every column of the relation, identifier included.
    pub columns: &'static [&'static str],
    /// The identifier column populated by the store on insert.
    pub id_column: &'static str,
    /// Columns whose value comes from a server-side default or sequence.
    /// Bulk inserts enforce uniform omission for these (see
    /// [`RepositoryError::InconsistentDefaultsError`](crate::RepositoryError)).
    pub server_default_columns: &'static [&'static str],
}

impl TableSpec {
    /// Columns without the identifier, in declaration order.
    #[must_use]
    pub fn data_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns
            .iter()
            .copied()
            .filter(move |column| *column != self.id_column)
    }

    #[must_use]
    pub fn has_server_default(&self, column: &str) -> bool {
        self.server_default_columns.contains(&column)
    }
}
