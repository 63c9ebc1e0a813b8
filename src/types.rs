use chrono::{NaiveDate, NaiveDateTime};
use sea_query::Value as SeaValue;
use serde_json::Value as JsonValue;

use crate::error::RepositoryError;

/// Values that can be stored in a record field, bound as a query parameter,
/// or read back from a result row.
///
/// One enum serves every seam of the crate so repositories, query objects
/// and executors never branch on driver types:
/// ```rust
/// use sql_repository::prelude::*;
///
/// let params = vec![
///     FieldValue::Int(1),
///     FieldValue::Text("alice".into()),
///     FieldValue::Bool(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value (without timezone)
    Timestamp(NaiveDateTime),
    /// Calendar date value
    Date(NaiveDate),
    /// NULL value
    Null,
    /// JSON value
    Json(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl FieldValue {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let FieldValue::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let FieldValue::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(value) => Some(*value),
            FieldValue::Int(0) => Some(false),
            FieldValue::Int(1) => Some(true),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let FieldValue::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            FieldValue::Timestamp(value) => Some(*value),
            FieldValue::Text(s) => {
                // Accept the two common textual renderings.
                chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                    .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.3f"))
                    .ok()
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(value) => Some(*value),
            FieldValue::Timestamp(value) => Some(value.date()),
            FieldValue::Text(s) => chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let FieldValue::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_json(&self) -> Option<&JsonValue> {
        if let FieldValue::Json(value) = self {
            Some(value)
        } else {
            None
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(value: NaiveDateTime) -> Self {
        FieldValue::Timestamp(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        FieldValue::Date(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

/// Conversion into the query builder's value type, used when a query object
/// binds a payload or filter parameter.
impl From<FieldValue> for SeaValue {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Int(i) => SeaValue::BigInt(Some(i)),
            FieldValue::Float(f) => SeaValue::Double(Some(f)),
            FieldValue::Text(s) => SeaValue::String(Some(Box::new(s))),
            FieldValue::Bool(b) => SeaValue::Bool(Some(b)),
            FieldValue::Timestamp(ts) => SeaValue::ChronoDateTime(Some(Box::new(ts))),
            FieldValue::Date(d) => SeaValue::ChronoDate(Some(Box::new(d))),
            FieldValue::Null => SeaValue::BigInt(None),
            FieldValue::Json(j) => SeaValue::Json(Some(Box::new(j))),
            FieldValue::Blob(b) => SeaValue::Bytes(Some(Box::new(b))),
        }
    }
}

/// Conversion back from the query builder's rendered parameter list.
///
/// Executors receive parameters in this unified shape regardless of which
/// builder expression produced them.
impl TryFrom<SeaValue> for FieldValue {
    type Error = RepositoryError;

    #[allow(unreachable_patterns)]
    fn try_from(value: SeaValue) -> Result<Self, Self::Error> {
        Ok(match value {
            SeaValue::Bool(v) => v.map_or(FieldValue::Null, FieldValue::Bool),
            SeaValue::TinyInt(v) => v.map_or(FieldValue::Null, |i| FieldValue::Int(i64::from(i))),
            SeaValue::SmallInt(v) => v.map_or(FieldValue::Null, |i| FieldValue::Int(i64::from(i))),
            SeaValue::Int(v) => v.map_or(FieldValue::Null, |i| FieldValue::Int(i64::from(i))),
            SeaValue::BigInt(v) => v.map_or(FieldValue::Null, FieldValue::Int),
            SeaValue::TinyUnsigned(v) => {
                v.map_or(FieldValue::Null, |i| FieldValue::Int(i64::from(i)))
            }
            SeaValue::SmallUnsigned(v) => {
                v.map_or(FieldValue::Null, |i| FieldValue::Int(i64::from(i)))
            }
            SeaValue::Unsigned(v) => v.map_or(FieldValue::Null, |i| FieldValue::Int(i64::from(i))),
            SeaValue::BigUnsigned(v) => match v {
                None => FieldValue::Null,
                Some(i) => FieldValue::Int(i64::try_from(i).map_err(|_| {
                    RepositoryError::ParameterError(format!("unsigned value {i} exceeds i64 range"))
                })?),
            },
            SeaValue::Float(v) => v.map_or(FieldValue::Null, |f| FieldValue::Float(f64::from(f))),
            SeaValue::Double(v) => v.map_or(FieldValue::Null, FieldValue::Float),
            SeaValue::String(v) => v.map_or(FieldValue::Null, |s| FieldValue::Text(*s)),
            SeaValue::Char(v) => v.map_or(FieldValue::Null, |c| FieldValue::Text(c.to_string())),
            SeaValue::Bytes(v) => v.map_or(FieldValue::Null, |b| FieldValue::Blob(*b)),
            SeaValue::Json(v) => v.map_or(FieldValue::Null, |j| FieldValue::Json(*j)),
            SeaValue::ChronoDate(v) => v.map_or(FieldValue::Null, |d| FieldValue::Date(*d)),
            SeaValue::ChronoDateTime(v) => {
                v.map_or(FieldValue::Null, |ts| FieldValue::Timestamp(*ts))
            }
            SeaValue::ChronoDateTimeUtc(v) => {
                v.map_or(FieldValue::Null, |ts| FieldValue::Timestamp(ts.naive_utc()))
            }
            other => {
                return Err(RepositoryError::ParameterError(format!(
                    "unsupported query builder value: {other:?}"
                )));
            }
        })
    }
}

/// Ordered column-name/value pairs: the serialized form of a record and the
/// payload shape of insert/update queries.
pub type ColumnValues = Vec<(String, FieldValue)>;

/// Look up a column's value in a serialized payload.
#[must_use]
pub fn column_value<'a>(values: &'a ColumnValues, column: &str) -> Option<&'a FieldValue> {
    values
        .iter()
        .find(|(name, _)| name == column)
        .map(|(_, value)| value)
}
