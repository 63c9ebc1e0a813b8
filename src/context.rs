//! Task-scoped executor slot.
//!
//! An alternative to threading an executor handle through every layer: the
//! caller opens a [`scope`] once per logical request or transaction, code
//! inside the scope constructs repositories with
//! [`Repository::from_context`](crate::Repository::from_context), and the
//! slot is cleared automatically when the scope's future completes. There is
//! no process-wide slot; reading outside a scope is an error.

use std::future::Future;

use crate::error::RepositoryError;
use crate::executor::SharedExecutor;

tokio::task_local! {
    static CURRENT_EXECUTOR: SharedExecutor;
}

/// Run `fut` with `executor` as the task's current executor.
pub async fn scope<F>(executor: SharedExecutor, fut: F) -> F::Output
where
    F: Future,
{
    CURRENT_EXECUTOR.scope(executor, fut).await
}

/// The current task's executor.
///
/// # Errors
/// Returns [`RepositoryError::ConnectionError`] when called outside a
/// [`scope`].
pub fn current() -> Result<SharedExecutor, RepositoryError> {
    CURRENT_EXECUTOR
        .try_with(Clone::clone)
        .map_err(|_| {
            RepositoryError::ConnectionError(
                "no executor in scope; wrap the call in context::scope or pass one explicitly"
                    .to_string(),
            )
        })
}
