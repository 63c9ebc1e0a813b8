//! In-memory repository double for tests of code that takes a repository.
//!
//! Mirrors the [`Repository`](crate::Repository) method surface without a
//! database: records live in a `Vec` behind a mutex and identifiers are
//! assigned from a counter. Filters and orders are opaque builder
//! expressions the fake cannot interpret, so filter-dependent operations
//! (`get_or_create`, `exists`, `delete`) return
//! [`RepositoryError::Unimplemented`], and `first`/`get_all` ignore their
//! filter and order arguments.

use std::future::Future;
use std::sync::Mutex;

use crate::error::RepositoryError;
use crate::queries::{Filter, OrderBy};
use crate::record::Record;
use crate::types::{ColumnValues, FieldValue};

pub struct FakeRepo<R: Record> {
    state: Mutex<State<R>>,
}

struct State<R> {
    records: Vec<R>,
    next_id: i64,
}

impl<R: Record> Default for FakeRepo<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> FakeRepo<R> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                records: Vec::new(),
                next_id: 1,
            }),
        }
    }

    /// Seed the fake with pre-existing records. Records without an
    /// identifier get one assigned, as if previously inserted.
    #[must_use]
    pub fn with_records(records: Vec<R>) -> Self {
        let fake = Self::new();
        {
            let mut state = fake.lock();
            for mut record in records {
                if record.id().is_none() {
                    record.set_id(state.next_id);
                }
                state.next_id = state.next_id.max(record.id().unwrap_or(0) + 1);
                state.records.push(record);
            }
        }
        fake
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State<R>> {
        // A poisoned lock means a panic mid-test; propagating it as a second
        // panic is the useful behavior there.
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// First stored record. Filters and orders are ignored.
    pub async fn first(
        &self,
        _filters: &[Filter],
        _orders: &[OrderBy],
    ) -> Result<Option<R>, RepositoryError> {
        Ok(self.lock().records.first().cloned())
    }

    /// Every stored record, in insertion order. Filters and orders are
    /// ignored.
    pub async fn get_all(
        &self,
        _filters: &[Filter],
        _orders: &[OrderBy],
    ) -> Result<Vec<R>, RepositoryError> {
        Ok(self.lock().records.clone())
    }

    pub async fn get_all_ids(
        &self,
        _filters: &[Filter],
        _orders: &[OrderBy],
    ) -> Result<Vec<i64>, RepositoryError> {
        Ok(self.lock().records.iter().filter_map(Record::id).collect())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<R>, RepositoryError> {
        Ok(self
            .lock()
            .records
            .iter()
            .find(|record| record.id() == Some(id))
            .cloned())
    }

    pub async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<R>, RepositoryError> {
        Ok(self
            .lock()
            .records
            .iter()
            .filter(|record| record.id().is_some_and(|id| ids.contains(&id)))
            .cloned()
            .collect())
    }

    pub async fn get_or_create(
        &self,
        _filters: &[Filter],
        _defaults: R,
    ) -> Result<(R, bool), RepositoryError> {
        Err(unimplemented("get_or_create"))
    }

    pub async fn exists(&self, _filters: &[Filter]) -> Result<bool, RepositoryError> {
        Err(unimplemented("exists"))
    }

    pub async fn insert(&self, record: &mut R) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        record.set_id(state.next_id);
        state.next_id += 1;
        state.records.push(record.clone());
        Ok(())
    }

    pub async fn insert_many(&self, records: &mut [R]) -> Result<(), RepositoryError> {
        for record in records.iter_mut() {
            self.insert(record).await?;
        }
        Ok(())
    }

    /// Replace the stored record sharing this record's identifier.
    pub async fn update(&self, record: &R) -> Result<(), RepositoryError> {
        let id = record.id().ok_or_else(|| {
            RepositoryError::PreconditionError(
                "update requires a record with a stored identifier".to_string(),
            )
        })?;
        let mut state = self.lock();
        if let Some(stored) = state.records.iter_mut().find(|r| r.id() == Some(id)) {
            *stored = record.clone();
        }
        Ok(())
    }

    /// Set the named fields on the record and its stored counterpart.
    pub async fn update_partial(
        &self,
        record: &mut R,
        updates: ColumnValues,
    ) -> Result<(), RepositoryError> {
        for (column, value) in &updates {
            record.set_column(column, value)?;
        }
        self.update(record).await
    }

    pub async fn update_many(&self, records: &[R]) -> Result<(), RepositoryError> {
        for record in records {
            self.update(record).await?;
        }
        Ok(())
    }

    pub async fn update_or_insert_first_by_field(
        &self,
        record: &mut R,
        field: &str,
    ) -> Result<(), RepositoryError> {
        let value = field_value(record, field)?;
        let existing_id = self
            .lock()
            .records
            .iter()
            .find(|stored| field_value(*stored, field).ok() == Some(value.clone()))
            .and_then(Record::id);
        match existing_id {
            Some(id) => {
                record.set_id(id);
                self.update(record).await
            }
            None => self.insert(record).await,
        }
    }

    pub async fn update_or_insert_many_by_field(
        &self,
        records: &mut [R],
        field: &str,
    ) -> Result<(), RepositoryError> {
        for record in records.iter_mut() {
            self.update_or_insert_first_by_field(record, field).await?;
        }
        Ok(())
    }

    pub async fn delete(&self, _filters: &[Filter]) -> Result<u64, RepositoryError> {
        Err(unimplemented("delete"))
    }

    pub async fn delete_by_id(&self, id: i64) -> Result<u64, RepositoryError> {
        self.delete_by_ids(&[id]).await
    }

    pub async fn delete_by_ids(&self, ids: &[i64]) -> Result<u64, RepositoryError> {
        let mut state = self.lock();
        let before = state.records.len();
        state
            .records
            .retain(|record| !record.id().is_some_and(|id| ids.contains(&id)));
        Ok((before - state.records.len()) as u64)
    }

    /// Run `body` as if in a transaction. The fake has no rollback; the body
    /// just executes.
    pub async fn execute_in_transaction<T, F, Fut>(&self, body: F) -> Result<T, RepositoryError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, RepositoryError>>,
    {
        body().await
    }
}

fn unimplemented(operation: &str) -> RepositoryError {
    RepositoryError::Unimplemented(format!(
        "{operation} depends on filter evaluation, which the in-memory fake does not do"
    ))
}

fn field_value<R: Record>(record: &R, field: &str) -> Result<FieldValue, RepositoryError> {
    crate::types::column_value(&record.to_columns(), field)
        .cloned()
        .ok_or_else(|| {
            RepositoryError::PreconditionError(format!(
                "record serializes no column named {field}"
            ))
        })
}
