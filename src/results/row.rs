use std::collections::HashMap;
use std::sync::Arc;

use crate::types::FieldValue;

/// A normalized result row keyed by column name.
///
/// Every executor variant produces this exact shape, so repository
/// deserialization never knows which backend ran the query. Column names are
/// shared across all rows of one result via `Arc`.
#[derive(Debug, Clone)]
pub struct Row {
    column_names: Arc<Vec<String>>,
    values: Vec<FieldValue>,
    // Name-to-index cache to avoid repeated string comparisons on wide rows.
    column_index: Arc<HashMap<String, usize>>,
}

impl Row {
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<FieldValue>) -> Self {
        let column_index = Arc::new(
            column_names
                .iter()
                .enumerate()
                .map(|(i, name)| (name.clone(), i))
                .collect::<HashMap<_, _>>(),
        );

        Self {
            column_names,
            values,
            column_index,
        }
    }

    /// Build a row sharing a previously computed column index.
    #[must_use]
    pub(crate) fn with_index(
        column_names: Arc<Vec<String>>,
        column_index: Arc<HashMap<String, usize>>,
        values: Vec<FieldValue>,
    ) -> Self {
        Self {
            column_names,
            values,
            column_index,
        }
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Get the index of a column by name.
    #[must_use]
    pub fn column_index(&self, column: &str) -> Option<usize> {
        if let Some(&idx) = self.column_index.get(column) {
            return Some(idx);
        }
        self.column_names.iter().position(|name| name == column)
    }

    /// Get a value by column name, or `None` if the column is absent.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.column_index(column).and_then(|idx| self.values.get(idx))
    }

    /// Get a value by position.
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&FieldValue> {
        self.values.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Share one column-name vector and index cache across a batch of rows.
pub(crate) struct RowBatchBuilder {
    column_names: Arc<Vec<String>>,
    column_index: Arc<HashMap<String, usize>>,
}

impl RowBatchBuilder {
    pub(crate) fn new(column_names: Vec<String>) -> Self {
        let column_index = Arc::new(
            column_names
                .iter()
                .enumerate()
                .map(|(i, name)| (name.clone(), i))
                .collect::<HashMap<_, _>>(),
        );
        Self {
            column_names: Arc::new(column_names),
            column_index,
        }
    }

    pub(crate) fn row(&self, values: Vec<FieldValue>) -> Row {
        Row::with_index(
            self.column_names.clone(),
            self.column_index.clone(),
            values,
        )
    }
}
