use async_trait::async_trait;
use tokio_postgres::Client;
use tracing::debug;

use crate::error::RepositoryError;
use crate::queries::BuiltQuery;
use crate::results::Row;
use crate::types::FieldValue;

use super::{
    ExecOptions, QueryExecutor, TxTracker, execute_rowcount, fetch_rows, scalar_from,
    single_returned_row,
};

/// Executor over a single caller-supplied connection.
///
/// Owns the session for its lifetime, so it honors every execution option,
/// including per-statement timeouts applied with `SET statement_timeout` and
/// reset afterwards. The connection may be shared across repository
/// instances, but each in-flight query owns it for one round trip.
pub struct ConnectionExecutor {
    client: Client,
    tx: TxTracker,
}

impl ConnectionExecutor {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            tx: TxTracker::new(),
        }
    }

    /// Give the connection back to the caller.
    #[must_use]
    pub fn into_inner(self) -> Client {
        self.client
    }

    async fn set_timeout(&self, opts: &ExecOptions) -> Result<bool, RepositoryError> {
        if let Some(timeout) = opts.statement_timeout {
            let millis = timeout.as_millis();
            self.client
                .batch_execute(&format!("SET statement_timeout = {millis}"))
                .await?;
            return Ok(true);
        }
        Ok(false)
    }

    async fn reset_timeout<T>(
        &self,
        applied: bool,
        result: Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        if applied {
            let reset = self.client.batch_execute("RESET statement_timeout").await;
            match (&result, reset) {
                // Keep the original failure; the reset error is secondary.
                (Err(_), Err(reset_err)) => {
                    debug!(error = %reset_err, "failed to reset statement_timeout");
                }
                (Ok(_), Err(reset_err)) => return Err(reset_err.into()),
                _ => {}
            }
        }
        result
    }

    async fn run_rows(
        &self,
        query: &BuiltQuery,
        opts: &ExecOptions,
    ) -> Result<Vec<Row>, RepositoryError> {
        let applied = self.set_timeout(opts).await?;
        let result = fetch_rows(&self.client, query, opts.prepare).await;
        self.reset_timeout(applied, result).await
    }

    async fn run_count(
        &self,
        query: &BuiltQuery,
        opts: &ExecOptions,
    ) -> Result<u64, RepositoryError> {
        let applied = self.set_timeout(opts).await?;
        let result = execute_rowcount(&self.client, query, opts.prepare).await;
        self.reset_timeout(applied, result).await
    }
}

#[async_trait]
impl QueryExecutor for ConnectionExecutor {
    async fn fetch_one(
        &self,
        query: &BuiltQuery,
        opts: &ExecOptions,
    ) -> Result<Option<Row>, RepositoryError> {
        Ok(self.run_rows(query, opts).await?.into_iter().next())
    }

    async fn fetch_all(
        &self,
        query: &BuiltQuery,
        opts: &ExecOptions,
    ) -> Result<Vec<Row>, RepositoryError> {
        self.run_rows(query, opts).await
    }

    async fn fetch_scalar(
        &self,
        query: &BuiltQuery,
        opts: &ExecOptions,
    ) -> Result<Option<FieldValue>, RepositoryError> {
        Ok(scalar_from(self.run_rows(query, opts).await?))
    }

    async fn insert_returning_one(
        &self,
        query: &BuiltQuery,
        opts: &ExecOptions,
    ) -> Result<Row, RepositoryError> {
        single_returned_row(self.run_rows(query, opts).await?)
    }

    async fn insert_returning_many(
        &self,
        query: &BuiltQuery,
        opts: &ExecOptions,
    ) -> Result<Vec<Row>, RepositoryError> {
        self.run_rows(query, opts).await
    }

    async fn execute(
        &self,
        query: &BuiltQuery,
        opts: &ExecOptions,
    ) -> Result<u64, RepositoryError> {
        self.run_count(query, opts).await
    }

    async fn begin(&self) -> Result<(), RepositoryError> {
        let statement = self.tx.begin_statement();
        self.client.batch_execute(&statement).await?;
        self.tx.mark_begun();
        debug!(statement = %statement, "transaction scope opened");
        Ok(())
    }

    async fn commit(&self) -> Result<(), RepositoryError> {
        let statement = self.tx.commit_statement()?;
        self.client.batch_execute(&statement).await?;
        self.tx.mark_closed();
        debug!(statement = %statement, "transaction scope committed");
        Ok(())
    }

    async fn rollback(&self) -> Result<(), RepositoryError> {
        let statement = self.tx.rollback_statement()?;
        self.client.batch_execute(&statement).await?;
        self.tx.mark_closed();
        debug!(statement = %statement, "transaction scope rolled back");
        Ok(())
    }
}
