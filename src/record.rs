use crate::error::RepositoryError;
use crate::results::Row;
use crate::types::{ColumnValues, FieldValue};

/// A structured value mapped to and from one table row.
///
/// The identifier starts out as `None` and is assigned by the store on
/// insert. `Default` supplies the declared per-field defaults that the
/// insertion pipeline compares against when deciding which columns to leave
/// to the database (see the repository's ignore-default configuration).
///
/// `from_row` is the explicit per-type factory: deserialization never
/// inspects generic parameters at runtime, each record type states how it is
/// built from a normalized [`Row`].
pub trait Record: Clone + Default + Send + Sync {
    /// The identifier, `None` until the record has been inserted.
    fn id(&self) -> Option<i64>;

    /// Assign the store-issued identifier after an insert.
    fn set_id(&mut self, id: i64);

    /// Serialize every field except the identifier, in column order.
    fn to_columns(&self) -> ColumnValues;

    /// Construct a record from a result row.
    ///
    /// # Errors
    /// Returns [`RepositoryError::DeserializeError`] when a required column
    /// is missing or holds a value of the wrong shape.
    fn from_row(row: &Row) -> Result<Self, RepositoryError>;

    /// Overwrite one field from its column value, used when deferred insert
    /// columns are read back and by partial updates.
    ///
    /// # Errors
    /// Returns [`RepositoryError::DeserializeError`] for unknown columns or
    /// mismatched value shapes.
    fn set_column(&mut self, column: &str, value: &FieldValue) -> Result<(), RepositoryError>;
}

/// Helper for `from_row` implementations: fetch a column or fail with a
/// uniform error.
///
/// # Errors
/// Returns [`RepositoryError::DeserializeError`] when the column is absent.
pub fn require_column<'a>(row: &'a Row, column: &str) -> Result<&'a FieldValue, RepositoryError> {
    row.get(column).ok_or_else(|| {
        RepositoryError::DeserializeError(format!("column {column} missing from result row"))
    })
}
