//! tokio-postgres plumbing shared by both executor variants: parameter
//! binding for [`FieldValue`](crate::FieldValue) and normalization of driver
//! rows into the executor-agnostic [`Row`](crate::Row) shape.

mod params;
mod rows;

pub use params::Params;
pub(crate) use rows::rows_to_common;
