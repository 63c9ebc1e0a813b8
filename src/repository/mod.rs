use std::future::Future;
use std::marker::PhantomData;

use sea_query::Value as SeaValue;
use tracing::debug;

use crate::context;
use crate::error::RepositoryError;
use crate::executor::{ExecOptions, SharedExecutor};
use crate::queries::{
    DeleteQuery, Filter, OrderBy, SelectQuery, UpdateQuery, column, column_expr,
};
use crate::record::Record;
use crate::results::Row;
use crate::table::TableSpec;
use crate::types::{ColumnValues, FieldValue, column_value};

mod insert;

/// Generic CRUD surface for one record type bound to one table.
///
/// A repository owns serialization (record to column values) and
/// deserialization (row to record) and delegates all execution to its
/// configured [`QueryExecutor`](crate::QueryExecutor). The executor is either
/// passed in explicitly or read from the task-scoped slot in
/// [`context`](crate::context) on every operation.
pub struct Repository<R: Record> {
    table: &'static TableSpec,
    ignore_default: &'static [&'static str],
    source: ExecutorSource,
    options: ExecOptions,
    _record: PhantomData<fn() -> R>,
}

enum ExecutorSource {
    Explicit(SharedExecutor),
    Context,
}

impl<R: Record> Repository<R> {
    #[must_use]
    pub fn new(table: &'static TableSpec, executor: SharedExecutor) -> Self {
        Self {
            table,
            ignore_default: &[],
            source: ExecutorSource::Explicit(executor),
            options: ExecOptions::default(),
            _record: PhantomData,
        }
    }

    /// Build a repository that resolves its executor from
    /// [`context::scope`] at each operation.
    #[must_use]
    pub fn from_context(table: &'static TableSpec) -> Self {
        Self {
            table,
            ignore_default: &[],
            source: ExecutorSource::Context,
            options: ExecOptions::default(),
            _record: PhantomData,
        }
    }

    /// Columns inserted only when the record's value differs from the
    /// field's declared default; otherwise the column is omitted so the
    /// database's own default or sequence applies, and the stored value is
    /// read back onto the record after the insert.
    #[must_use]
    pub fn ignore_default(mut self, columns: &'static [&'static str]) -> Self {
        self.ignore_default = columns;
        self
    }

    /// Execution options forwarded to the executor on every statement.
    #[must_use]
    pub fn exec_options(mut self, options: ExecOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn table(&self) -> &'static TableSpec {
        self.table
    }

    fn executor(&self) -> Result<SharedExecutor, RepositoryError> {
        match &self.source {
            ExecutorSource::Explicit(executor) => Ok(executor.clone()),
            ExecutorSource::Context => context::current(),
        }
    }

    /// Serialize a record to column values, always excluding the identifier.
    #[must_use]
    pub fn serialize(&self, record: &R) -> ColumnValues {
        record
            .to_columns()
            .into_iter()
            .filter(|(column, _)| column != self.table.id_column)
            .collect()
    }

    /// Construct a record from a result row via the record's factory.
    ///
    /// # Errors
    /// Propagates [`Record::from_row`] failures.
    pub fn deserialize(&self, row: &Row) -> Result<R, RepositoryError> {
        R::from_row(row)
    }

    // ==============
    // SELECT METHODS
    // ==============

    /// First record matching the filters and orders, if any.
    ///
    /// # Errors
    /// Propagates executor and deserialization failures.
    pub async fn first(
        &self,
        filters: &[Filter],
        orders: &[OrderBy],
    ) -> Result<Option<R>, RepositoryError> {
        let query = SelectQuery::new(self.table, filters, orders).build()?;
        let row = self.executor()?.fetch_one(&query, &self.options).await?;
        row.map(|row| self.deserialize(&row)).transpose()
    }

    /// All records matching the filters, in the given order.
    ///
    /// # Errors
    /// Propagates executor and deserialization failures.
    pub async fn get_all(
        &self,
        filters: &[Filter],
        orders: &[OrderBy],
    ) -> Result<Vec<R>, RepositoryError> {
        let query = SelectQuery::new(self.table, filters, orders).build()?;
        let rows = self.executor()?.fetch_all(&query, &self.options).await?;
        rows.iter().map(|row| self.deserialize(row)).collect()
    }

    /// Same as [`get_all`](Self::get_all) but projects only identifiers.
    ///
    /// # Errors
    /// Propagates executor failures; a non-integer identifier column is an
    /// execution error.
    pub async fn get_all_ids(
        &self,
        filters: &[Filter],
        orders: &[OrderBy],
    ) -> Result<Vec<i64>, RepositoryError> {
        let query = SelectQuery::new(self.table, filters, orders)
            .select_exprs(vec![column_expr(self.table.id_column)])
            .build()?;
        let rows = self.executor()?.fetch_all(&query, &self.options).await?;
        rows.iter()
            .map(|row| {
                row.get_by_index(0)
                    .and_then(|value| value.as_int().copied())
                    .ok_or_else(|| {
                        RepositoryError::ExecutionError(format!(
                            "column {} did not produce an integer identifier",
                            self.table.id_column
                        ))
                    })
            })
            .collect()
    }

    /// The record whose identifier equals `id`, if any.
    ///
    /// # Errors
    /// Propagates executor and deserialization failures.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<R>, RepositoryError> {
        self.first(&[column(self.table.id_column).eq(id)], &[]).await
    }

    /// All records whose identifier is in `ids`.
    ///
    /// # Errors
    /// Propagates executor and deserialization failures.
    pub async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<R>, RepositoryError> {
        let filter = column(self.table.id_column).is_in(ids.iter().copied());
        self.get_all(&[filter], &[]).await
    }

    /// Return the first record matching `filters`, or insert `defaults` and
    /// return it with a created flag of `true`.
    ///
    /// Not atomic: two concurrent callers can both observe no match and both
    /// insert. Guard with a uniqueness constraint on the filtered columns if
    /// duplicates matter.
    ///
    /// # Errors
    /// Propagates executor and deserialization failures.
    pub async fn get_or_create(
        &self,
        filters: &[Filter],
        defaults: R,
    ) -> Result<(R, bool), RepositoryError> {
        if let Some(found) = self.first(filters, &[]).await? {
            return Ok((found, false));
        }

        let mut record = defaults;
        self.insert(&mut record).await?;
        Ok((record, true))
    }

    /// True iff at least one row matches the filters.
    ///
    /// # Errors
    /// Propagates executor failures.
    pub async fn exists(&self, filters: &[Filter]) -> Result<bool, RepositoryError> {
        let query = SelectQuery::new(self.table, filters, &[])
            .select_exprs(vec![column(self.table.id_column).count()])
            .build()?;
        let value = self.executor()?.fetch_scalar(&query, &self.options).await?;
        Ok(matches!(value, Some(FieldValue::Int(count)) if count > 0))
    }

    // ==============
    // INSERT METHODS
    // ==============

    /// Insert one record, assigning its identifier and resolving
    /// ignore-default fields from the store.
    ///
    /// # Errors
    /// Propagates executor failures.
    pub async fn insert(&self, record: &mut R) -> Result<(), RepositoryError> {
        insert::insert(self, record).await
    }

    /// Insert a batch with one multi-row statement.
    ///
    /// An empty batch issues no query. A batch that mixes default and
    /// explicit values for a sequence-backed ignore-default column is
    /// rejected before any statement runs.
    ///
    /// # Errors
    /// [`RepositoryError::InconsistentDefaultsError`] for mixed batches;
    /// otherwise propagates executor failures.
    pub async fn insert_many(&self, records: &mut [R]) -> Result<(), RepositoryError> {
        insert::insert_many(self, records).await
    }

    // ==============
    // UPDATE METHODS
    // ==============

    /// Replace all serializable fields of the row matching the record's
    /// identifier.
    ///
    /// # Errors
    /// [`RepositoryError::PreconditionError`] when the record has no
    /// identifier; otherwise propagates executor failures.
    pub async fn update(&self, record: &R) -> Result<(), RepositoryError> {
        let id = require_id(record, "update")?;
        let payload = self.serialize(record);
        let query = UpdateQuery::by_id(id, self.table, &payload).build()?;
        self.executor()?.execute(&query, &self.options).await?;
        Ok(())
    }

    /// Set the named fields on the in-memory record, then send only those
    /// fields' serialized values to the store.
    ///
    /// # Errors
    /// [`RepositoryError::PreconditionError`] when the record has no
    /// identifier; unknown columns fail record mutation; otherwise propagates
    /// executor failures.
    pub async fn update_partial(
        &self,
        record: &mut R,
        updates: ColumnValues,
    ) -> Result<(), RepositoryError> {
        let id = require_id(record, "update_partial")?;

        for (column, value) in &updates {
            record.set_column(column, value)?;
        }

        let serialized = self.serialize(record);
        let payload: ColumnValues = updates
            .iter()
            .map(|(column, _)| {
                let value = column_value(&serialized, column)
                    .cloned()
                    .unwrap_or(FieldValue::Null);
                (column.clone(), value)
            })
            .collect();

        let query = UpdateQuery::by_id(id, self.table, &payload).build()?;
        self.executor()?.execute(&query, &self.options).await?;
        Ok(())
    }

    /// Bulk column update for rows matching the filters, without loading
    /// records. Returns the affected row count.
    ///
    /// # Errors
    /// Propagates executor failures.
    pub async fn update_values(
        &self,
        values: &ColumnValues,
        filters: &[Filter],
    ) -> Result<u64, RepositoryError> {
        let query = UpdateQuery::new(self.table, values, filters.to_vec()).build()?;
        self.executor()?.execute(&query, &self.options).await
    }

    /// Update each record sequentially inside one transaction scope.
    ///
    /// The backends offer no single statement that correlates per-row SET
    /// clauses with per-row WHERE clauses, so this is one UPDATE per record
    /// by design.
    ///
    /// # Errors
    /// The first failing update rolls back the whole scope.
    pub async fn update_many(&self, records: &[R]) -> Result<(), RepositoryError> {
        if records.is_empty() {
            return Ok(());
        }

        self.execute_in_transaction(move || async move {
            for record in records {
                self.update(record).await?;
            }
            Ok(())
        })
        .await
    }

    /// Update the row matching the record's value for `field`, preserving
    /// that row's identifier, or insert the record if no row matches.
    ///
    /// # Errors
    /// [`RepositoryError::PreconditionError`] when the record does not
    /// serialize a column named `field`; otherwise propagates executor
    /// failures.
    pub async fn update_or_insert_first_by_field(
        &self,
        record: &mut R,
        field: &str,
    ) -> Result<(), RepositoryError> {
        let serialized = self.serialize(record);
        let value = require_field(&serialized, field)?;
        let filter = column(field).eq(SeaValue::from(value));

        match self.first(&[filter], &[]).await? {
            Some(existing) => {
                let id = stored_id(&existing)?;
                record.set_id(id);
                self.update(record).await
            }
            None => self.insert(record).await,
        }
    }

    /// For each record: update the existing row sharing its value for
    /// `field` (keeping that row's identifier) or insert it. Runs inside one
    /// transaction scope.
    ///
    /// # Errors
    /// [`RepositoryError::PreconditionError`] when a record does not
    /// serialize a column named `field`; any failure rolls back the scope.
    pub async fn update_or_insert_many_by_field(
        &self,
        records: &mut [R],
        field: &str,
    ) -> Result<(), RepositoryError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut values = Vec::with_capacity(records.len());
        for record in records.iter() {
            let serialized = self.serialize(record);
            values.push(require_field(&serialized, field)?);
        }

        let filter = column(field).is_in(values.iter().map(|value| SeaValue::from(value.clone())));
        let existing = self.get_all(&[filter], &[]).await?;

        let mut existing_ids: Vec<(FieldValue, i64)> = Vec::with_capacity(existing.len());
        for record in &existing {
            let serialized = self.serialize(record);
            let value = require_field(&serialized, field)?;
            existing_ids.push((value, stored_id(record)?));
        }

        self.execute_in_transaction(move || async move {
            for (record, value) in records.iter_mut().zip(&values) {
                match existing_ids.iter().find(|(existing, _)| existing == value) {
                    Some((_, id)) => {
                        record.set_id(*id);
                        self.update(record).await?;
                    }
                    None => self.insert(record).await?,
                }
            }
            Ok(())
        })
        .await
    }

    // ==============
    // DELETE METHODS
    // ==============

    /// Delete rows matching the filters, returning the affected row count.
    ///
    /// # Errors
    /// [`RepositoryError::MissingFilterError`] when called with zero filters;
    /// pass [`match_all()`](crate::queries::match_all) to delete every row.
    pub async fn delete(&self, filters: &[Filter]) -> Result<u64, RepositoryError> {
        let query = DeleteQuery::new(self.table, filters).build()?;
        self.executor()?.execute(&query, &self.options).await
    }

    /// Delete the row whose identifier equals `id`.
    ///
    /// # Errors
    /// Propagates executor failures.
    pub async fn delete_by_id(&self, id: i64) -> Result<u64, RepositoryError> {
        self.delete(&[column(self.table.id_column).eq(id)]).await
    }

    /// Delete every row whose identifier is in `ids`.
    ///
    /// # Errors
    /// Propagates executor failures.
    pub async fn delete_by_ids(&self, ids: &[i64]) -> Result<u64, RepositoryError> {
        let filter = column(self.table.id_column).is_in(ids.iter().copied());
        self.delete(&[filter]).await
    }

    // ==============
    // OTHER METHODS
    // ==============

    /// Run `body` inside one transaction scope: commit when it returns `Ok`,
    /// roll back when it returns `Err`. Scopes nest via savepoints, so a
    /// method that opens its own scope works inside a caller's scope.
    ///
    /// ```rust,no_run
    /// # use sql_repository::prelude::*;
    /// # async fn demo<R: Record>(repo: &Repository<R>, a: &mut R, b: &mut R)
    /// #     -> Result<(), RepositoryError> {
    /// repo.execute_in_transaction(move || async move {
    ///     repo.insert(a).await?;
    ///     repo.insert(b).await?;
    ///     Ok(())
    /// })
    /// .await
    /// # }
    /// ```
    ///
    /// # Errors
    /// The body's error is returned after rollback; a rollback failure is
    /// logged, never masking the original error.
    pub async fn execute_in_transaction<T, F, Fut>(&self, body: F) -> Result<T, RepositoryError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, RepositoryError>>,
    {
        let executor = self.executor()?;
        executor.begin().await?;
        match body().await {
            Ok(value) => {
                executor.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = executor.rollback().await {
                    debug!(error = %rollback_err, "rollback failed after scope error");
                }
                Err(err)
            }
        }
    }
}

fn require_id<R: Record>(record: &R, operation: &str) -> Result<i64, RepositoryError> {
    record.id().ok_or_else(|| {
        RepositoryError::PreconditionError(format!(
            "{operation} requires a record with a stored identifier"
        ))
    })
}

fn stored_id<R: Record>(record: &R) -> Result<i64, RepositoryError> {
    record.id().ok_or_else(|| {
        RepositoryError::DeserializeError("stored record is missing its identifier".to_string())
    })
}

fn require_field(
    serialized: &ColumnValues,
    field: &str,
) -> Result<FieldValue, RepositoryError> {
    column_value(serialized, field).cloned().ok_or_else(|| {
        RepositoryError::PreconditionError(format!("record serializes no column named {field}"))
    })
}
