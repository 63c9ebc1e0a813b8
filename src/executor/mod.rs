use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::RepositoryError;
use crate::postgres::{Params, rows_to_common};
use crate::queries::BuiltQuery;
use crate::results::Row;
use crate::types::FieldValue;

mod connection;
mod pooled;

pub use connection::ConnectionExecutor;
pub use pooled::PooledExecutor;

/// Backend-specific execution parameters.
///
/// Each executor variant honors what it can and rejects the rest with
/// [`RepositoryError::UnsupportedParameterError`] rather than silently
/// ignoring it, so behavior never diverges quietly between backends.
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Prepare statements explicitly before executing them.
    pub prepare: bool,
    /// Per-statement timeout. Supported by [`ConnectionExecutor`] (which owns
    /// its session); rejected by [`PooledExecutor`] because a session-scoped
    /// `SET` would leak to later borrowers of the pooled connection.
    pub statement_timeout: Option<Duration>,
}

impl ExecOptions {
    #[must_use]
    pub fn prepared() -> Self {
        Self {
            prepare: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = Some(timeout);
        self
    }
}

/// The backend-abstraction seam: translates built queries into driver calls
/// and normalizes every result to the shared [`Row`] shape.
///
/// Backend errors propagate unchanged; no method retries or reconnects.
/// Statements issued sequentially through one executor run in issuance order
/// on its single underlying session. Issuing two queries concurrently on one
/// executor from independent tasks is not guarded here.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Execute a SELECT and return the first result row, if any.
    async fn fetch_one(
        &self,
        query: &BuiltQuery,
        opts: &ExecOptions,
    ) -> Result<Option<Row>, RepositoryError>;

    /// Execute a SELECT and return all result rows.
    async fn fetch_all(
        &self,
        query: &BuiltQuery,
        opts: &ExecOptions,
    ) -> Result<Vec<Row>, RepositoryError>;

    /// Execute a SELECT and return the first column of the first row.
    async fn fetch_scalar(
        &self,
        query: &BuiltQuery,
        opts: &ExecOptions,
    ) -> Result<Option<FieldValue>, RepositoryError>;

    /// Execute an INSERT with a RETURNING clause and return the single
    /// returned row.
    async fn insert_returning_one(
        &self,
        query: &BuiltQuery,
        opts: &ExecOptions,
    ) -> Result<Row, RepositoryError>;

    /// Execute a multi-row INSERT with a RETURNING clause and return one row
    /// per inserted record, order-preserving.
    async fn insert_returning_many(
        &self,
        query: &BuiltQuery,
        opts: &ExecOptions,
    ) -> Result<Vec<Row>, RepositoryError>;

    /// Execute an UPDATE or DELETE and return the affected row count.
    async fn execute(
        &self,
        query: &BuiltQuery,
        opts: &ExecOptions,
    ) -> Result<u64, RepositoryError>;

    /// Open a transaction scope on this executor's session. Nested calls map
    /// to savepoints.
    async fn begin(&self) -> Result<(), RepositoryError>;

    /// Commit the innermost open scope.
    async fn commit(&self) -> Result<(), RepositoryError>;

    /// Roll back the innermost open scope.
    async fn rollback(&self) -> Result<(), RepositoryError>;
}

/// Shared handle shape used wherever an executor changes hands.
pub type SharedExecutor = Arc<dyn QueryExecutor>;

/// Tracks transaction nesting on one session so scopes opened inside an
/// already-open scope become savepoints instead of a second BEGIN.
#[derive(Debug, Default)]
pub(crate) struct TxTracker {
    depth: AtomicUsize,
}

impl TxTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn begin_statement(&self) -> String {
        match self.depth.load(Ordering::Acquire) {
            0 => "BEGIN".to_string(),
            n => format!("SAVEPOINT sp_{n}"),
        }
    }

    pub(crate) fn mark_begun(&self) {
        self.depth.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn commit_statement(&self) -> Result<String, RepositoryError> {
        match self.depth.load(Ordering::Acquire) {
            0 => Err(RepositoryError::PreconditionError(
                "commit issued with no open transaction".to_string(),
            )),
            1 => Ok("COMMIT".to_string()),
            n => Ok(format!("RELEASE SAVEPOINT sp_{}", n - 1)),
        }
    }

    pub(crate) fn rollback_statement(&self) -> Result<String, RepositoryError> {
        match self.depth.load(Ordering::Acquire) {
            0 => Err(RepositoryError::PreconditionError(
                "rollback issued with no open transaction".to_string(),
            )),
            1 => Ok("ROLLBACK".to_string()),
            n => {
                let name = format!("sp_{}", n - 1);
                Ok(format!(
                    "ROLLBACK TO SAVEPOINT {name}; RELEASE SAVEPOINT {name}"
                ))
            }
        }
    }

    pub(crate) fn mark_closed(&self) {
        self.depth.fetch_sub(1, Ordering::AcqRel);
    }
}

/// SELECT/RETURNING path shared by both executor variants.
pub(crate) async fn fetch_rows(
    client: &tokio_postgres::Client,
    query: &BuiltQuery,
    prepare: bool,
) -> Result<Vec<Row>, RepositoryError> {
    debug!(sql = %query.sql, params = query.params.len(), "executing query");
    let converted = Params::convert(&query.params)?;
    let rows = if prepare {
        let stmt = client.prepare(&query.sql).await?;
        client.query(&stmt, converted.as_refs()).await?
    } else {
        client.query(&query.sql, converted.as_refs()).await?
    };
    rows_to_common(&rows)
}

/// UPDATE/DELETE path shared by both executor variants.
pub(crate) async fn execute_rowcount(
    client: &tokio_postgres::Client,
    query: &BuiltQuery,
    prepare: bool,
) -> Result<u64, RepositoryError> {
    debug!(sql = %query.sql, params = query.params.len(), "executing statement");
    let converted = Params::convert(&query.params)?;
    let count = if prepare {
        let stmt = client.prepare(&query.sql).await?;
        client.execute(&stmt, converted.as_refs()).await?
    } else {
        client.execute(&query.sql, converted.as_refs()).await?
    };
    Ok(count)
}

pub(crate) fn scalar_from(rows: Vec<Row>) -> Option<FieldValue> {
    rows.into_iter()
        .next()
        .and_then(|row| row.get_by_index(0).cloned())
}

pub(crate) fn single_returned_row(rows: Vec<Row>) -> Result<Row, RepositoryError> {
    rows.into_iter().next().ok_or_else(|| {
        RepositoryError::ExecutionError("insert returned no row".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_tracker_nests_with_savepoints() {
        let tx = TxTracker::new();
        assert_eq!(tx.begin_statement(), "BEGIN");
        tx.mark_begun();
        assert_eq!(tx.begin_statement(), "SAVEPOINT sp_1");
        tx.mark_begun();
        assert_eq!(
            tx.rollback_statement().unwrap(),
            "ROLLBACK TO SAVEPOINT sp_1; RELEASE SAVEPOINT sp_1"
        );
        tx.mark_closed();
        assert_eq!(tx.commit_statement().unwrap(), "COMMIT");
        tx.mark_closed();
        assert!(tx.commit_statement().is_err());
    }
}
