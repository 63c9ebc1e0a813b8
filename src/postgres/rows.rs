use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value as JsonValue;

use crate::error::RepositoryError;
use crate::results::{Row, RowBatchBuilder};
use crate::types::FieldValue;

/// Normalize driver rows into the executor-agnostic row shape, sharing one
/// column-name vector across the batch.
pub(crate) fn rows_to_common(rows: &[tokio_postgres::Row]) -> Result<Vec<Row>, RepositoryError> {
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };

    let column_names: Vec<String> = first
        .columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect();
    let column_count = column_names.len();
    let builder = RowBatchBuilder::new(column_names);

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let mut values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            values.push(extract_value(row, idx)?);
        }
        out.push(builder.row(values));
    }

    Ok(out)
}

/// Extract one column as a [`FieldValue`], keyed on the column's declared
/// Postgres type.
fn extract_value(row: &tokio_postgres::Row, idx: usize) -> Result<FieldValue, RepositoryError> {
    let type_name = row.columns()[idx].type_().name();

    match type_name {
        "int2" => {
            let val: Option<i16> = row.try_get(idx)?;
            Ok(val.map_or(FieldValue::Null, |v| FieldValue::Int(i64::from(v))))
        }
        "int4" => {
            let val: Option<i32> = row.try_get(idx)?;
            Ok(val.map_or(FieldValue::Null, |v| FieldValue::Int(i64::from(v))))
        }
        "int8" => {
            let val: Option<i64> = row.try_get(idx)?;
            Ok(val.map_or(FieldValue::Null, FieldValue::Int))
        }
        "float4" => {
            let val: Option<f32> = row.try_get(idx)?;
            Ok(val.map_or(FieldValue::Null, |v| FieldValue::Float(f64::from(v))))
        }
        "float8" => {
            let val: Option<f64> = row.try_get(idx)?;
            Ok(val.map_or(FieldValue::Null, FieldValue::Float))
        }
        "bool" => {
            let val: Option<bool> = row.try_get(idx)?;
            Ok(val.map_or(FieldValue::Null, FieldValue::Bool))
        }
        "timestamp" | "timestamptz" => {
            let val: Option<NaiveDateTime> = row.try_get(idx)?;
            Ok(val.map_or(FieldValue::Null, FieldValue::Timestamp))
        }
        "date" => {
            let val: Option<NaiveDate> = row.try_get(idx)?;
            Ok(val.map_or(FieldValue::Null, FieldValue::Date))
        }
        "json" | "jsonb" => {
            let val: Option<JsonValue> = row.try_get(idx)?;
            Ok(val.map_or(FieldValue::Null, FieldValue::Json))
        }
        "bytea" => {
            let val: Option<Vec<u8>> = row.try_get(idx)?;
            Ok(val.map_or(FieldValue::Null, FieldValue::Blob))
        }
        _ => {
            // Text types and anything else that renders as text.
            let val: Option<String> = row.try_get(idx)?;
            Ok(val.map_or(FieldValue::Null, FieldValue::Text))
        }
    }
}
