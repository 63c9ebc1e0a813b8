//! Generic async repository layer over PostgreSQL.
//!
//! A [`Repository`] maps a record type onto one table and exposes
//! CRUD/filter/order operations. It never talks to a driver directly:
//! query objects in [`queries`] render backend-ready SQL through the query
//! builder, and a [`QueryExecutor`] runs it, either a
//! [`ConnectionExecutor`](executor::ConnectionExecutor) over a single
//! caller-supplied connection or a
//! [`PooledExecutor`](executor::PooledExecutor) over a deadpool checkout.
//! Results come back as normalized [`Row`]s regardless of which executor
//! ran the query.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sql_repository::prelude::*;
//!
//! # #[derive(Clone, Default)]
//! # struct Transaction;
//! # impl Record for Transaction {
//! #     fn id(&self) -> Option<i64> { None }
//! #     fn set_id(&mut self, _: i64) {}
//! #     fn to_columns(&self) -> ColumnValues { vec![] }
//! #     fn from_row(_: &Row) -> Result<Self, RepositoryError> { Ok(Self) }
//! #     fn set_column(&mut self, _: &str, _: &FieldValue) -> Result<(), RepositoryError> { Ok(()) }
//! # }
//! # static TRANSACTIONS: TableSpec = TableSpec {
//! #     name: "transactions", columns: &["id", "date", "price"],
//! #     id_column: "id", server_default_columns: &[],
//! # };
//! # async fn demo(client: tokio_postgres::Client) -> Result<(), RepositoryError> {
//! let executor: SharedExecutor = Arc::new(ConnectionExecutor::new(client));
//! let repo: Repository<Transaction> = Repository::new(&TRANSACTIONS, executor);
//!
//! let expensive = repo
//!     .get_all(&[column("price").gt(100)], &[OrderBy::asc("date")])
//!     .await?;
//! # let _ = expensive;
//! # Ok(())
//! # }
//! ```
//!
//! Executors can also be installed for a task scope with
//! [`context::scope`] and picked up by repositories built with
//! [`Repository::from_context`], which keeps one transaction-bound executor
//! flowing through layered code without threading it by hand.

pub mod context;
pub mod error;
pub mod executor;
pub mod fake;
pub mod postgres;
pub mod prelude;
pub mod queries;
pub mod record;
pub mod repository;
pub mod results;
pub mod table;
pub mod types;

pub use error::RepositoryError;
pub use executor::{ConnectionExecutor, ExecOptions, PooledExecutor, QueryExecutor, SharedExecutor};
pub use fake::FakeRepo;
pub use queries::{BuiltQuery, Filter, OrderBy, column, match_all};
pub use record::Record;
pub use repository::Repository;
pub use results::Row;
pub use table::TableSpec;
pub use types::{ColumnValues, FieldValue};
