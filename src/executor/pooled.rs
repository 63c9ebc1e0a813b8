use async_trait::async_trait;
use deadpool_postgres::{Object, Pool};
use tracing::debug;

use crate::error::RepositoryError;
use crate::queries::BuiltQuery;
use crate::results::Row;
use crate::types::FieldValue;

use super::{
    ExecOptions, QueryExecutor, TxTracker, execute_rowcount, fetch_rows, scalar_from,
    single_returned_row,
};

/// Executor over a connection checked out of a deadpool pool.
///
/// Holds the pooled connection for the executor's lifetime so transaction
/// scopes stay on one session. Execution options the pooled session cannot
/// honor safely are rejected with an explicit error instead of being
/// ignored: a session-scoped `SET statement_timeout` would leak to whoever
/// borrows the connection next.
pub struct PooledExecutor {
    conn: Object,
    tx: TxTracker,
}

impl PooledExecutor {
    /// Check a connection out of the pool.
    ///
    /// # Errors
    /// Returns the pool's own error when checkout fails; it is not retried.
    pub async fn acquire(pool: &Pool) -> Result<Self, RepositoryError> {
        let conn = pool.get().await?;
        Ok(Self {
            conn,
            tx: TxTracker::new(),
        })
    }

    #[must_use]
    pub fn new(conn: Object) -> Self {
        Self {
            conn,
            tx: TxTracker::new(),
        }
    }

    fn client(&self) -> &tokio_postgres::Client {
        &self.conn
    }

    fn check_options(opts: &ExecOptions) -> Result<(), RepositoryError> {
        if opts.statement_timeout.is_some() {
            return Err(RepositoryError::UnsupportedParameterError(
                "statement_timeout is not supported on a pooled connection".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl QueryExecutor for PooledExecutor {
    async fn fetch_one(
        &self,
        query: &BuiltQuery,
        opts: &ExecOptions,
    ) -> Result<Option<Row>, RepositoryError> {
        Self::check_options(opts)?;
        Ok(fetch_rows(self.client(), query, opts.prepare)
            .await?
            .into_iter()
            .next())
    }

    async fn fetch_all(
        &self,
        query: &BuiltQuery,
        opts: &ExecOptions,
    ) -> Result<Vec<Row>, RepositoryError> {
        Self::check_options(opts)?;
        fetch_rows(self.client(), query, opts.prepare).await
    }

    async fn fetch_scalar(
        &self,
        query: &BuiltQuery,
        opts: &ExecOptions,
    ) -> Result<Option<FieldValue>, RepositoryError> {
        Self::check_options(opts)?;
        Ok(scalar_from(
            fetch_rows(self.client(), query, opts.prepare).await?,
        ))
    }

    async fn insert_returning_one(
        &self,
        query: &BuiltQuery,
        opts: &ExecOptions,
    ) -> Result<Row, RepositoryError> {
        Self::check_options(opts)?;
        single_returned_row(fetch_rows(self.client(), query, opts.prepare).await?)
    }

    async fn insert_returning_many(
        &self,
        query: &BuiltQuery,
        opts: &ExecOptions,
    ) -> Result<Vec<Row>, RepositoryError> {
        Self::check_options(opts)?;
        fetch_rows(self.client(), query, opts.prepare).await
    }

    async fn execute(
        &self,
        query: &BuiltQuery,
        opts: &ExecOptions,
    ) -> Result<u64, RepositoryError> {
        Self::check_options(opts)?;
        execute_rowcount(self.client(), query, opts.prepare).await
    }

    async fn begin(&self) -> Result<(), RepositoryError> {
        let statement = self.tx.begin_statement();
        self.client().batch_execute(&statement).await?;
        self.tx.mark_begun();
        debug!(statement = %statement, "transaction scope opened");
        Ok(())
    }

    async fn commit(&self) -> Result<(), RepositoryError> {
        let statement = self.tx.commit_statement()?;
        self.client().batch_execute(&statement).await?;
        self.tx.mark_closed();
        debug!(statement = %statement, "transaction scope committed");
        Ok(())
    }

    async fn rollback(&self) -> Result<(), RepositoryError> {
        let statement = self.tx.rollback_statement()?;
        self.client().batch_execute(&statement).await?;
        self.tx.mark_closed();
        debug!(statement = %statement, "transaction scope rolled back");
        Ok(())
    }
}
