use thiserror::Error;

/// Error type for every repository and executor operation.
///
/// Driver and pool errors pass through unchanged; this layer adds no
/// retries and no wrapping beyond the transparent variants.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[error(transparent)]
    PoolError(#[from] deadpool_postgres::PoolError),

    #[error("delete issued without filters; pass match_all() to delete every row")]
    MissingFilterError,

    #[error(
        "all records in a bulk insert must either leave column {0} at its default or all set it explicitly"
    )]
    InconsistentDefaultsError(String),

    #[error("unsupported execution parameter: {0}")]
    UnsupportedParameterError(String),

    #[error("precondition failed: {0}")]
    PreconditionError(String),

    #[error("connection error: {0}")]
    ConnectionError(String),

    #[error("parameter conversion error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("row deserialization error: {0}")]
    DeserializeError(String),

    #[error("unimplemented operation: {0}")]
    Unimplemented(String),
}
