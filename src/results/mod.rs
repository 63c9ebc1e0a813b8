mod row;

pub use row::Row;
pub(crate) use row::RowBatchBuilder;
