//! Conversions between SQLite values and JSON.

use crate::error::ApiError;
use crate::schema::{ColumnType, TableMeta};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rusqlite::types::{Value as SqlValue, ValueRef};
use serde_json::{Map, Value};

/// One table row as a JSON object, columns in table order
pub type Row = Map<String, Value>;

/// Column name and bound value, in the order they appear in SQL
pub type Fields = Vec<(String, SqlValue)>;

/// SQLite value to JSON. BLOBs are emitted as base64 strings.
#[must_use]
pub fn sql_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::Number(n.into()),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(BASE64.encode(b)),
    }
}

/// JSON value to the SQL value bound for a column of `column_type`.
///
/// Strings go through the column's affinity so form posts (all strings) store
/// numbers as numbers. Booleans become 0/1; arrays and objects are stored as
/// their JSON text.
#[must_use]
pub fn json_to_sql(value: &Value, column_type: ColumnType) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                SqlValue::Real(f)
            } else {
                SqlValue::Text(n.to_string())
            }
        }
        Value::String(s) => column_type.coerce(s),
        Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
    }
}

/// Convert a request body object into bound fields, rejecting unknown columns.
pub fn fields_from_object(table: &TableMeta, body: &Map<String, Value>) -> Result<Fields, ApiError> {
    body.iter()
        .map(|(name, value)| {
            let column = table.column(name).ok_or_else(|| {
                ApiError::BadRequest(format!("[{}] has no column named [{name}]", table.name))
            })?;
            Ok((column.name.clone(), json_to_sql(value, column.column_type)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sql_to_json() {
        assert_eq!(sql_to_json(ValueRef::Integer(7)), json!(7));
        assert_eq!(sql_to_json(ValueRef::Real(1.5)), json!(1.5));
        assert_eq!(sql_to_json(ValueRef::Text(b"AC/DC")), json!("AC/DC"));
        assert_eq!(sql_to_json(ValueRef::Blob(&[0xde, 0xad])), json!("3q0="));
        assert_eq!(sql_to_json(ValueRef::Null), Value::Null);
    }

    #[test]
    fn test_json_to_sql() {
        assert_eq!(json_to_sql(&json!(true), ColumnType::Integer), SqlValue::Integer(1));
        assert_eq!(json_to_sql(&json!("12"), ColumnType::Integer), SqlValue::Integer(12));
        assert_eq!(
            json_to_sql(&json!("12"), ColumnType::Text),
            SqlValue::Text("12".to_string())
        );
        assert_eq!(
            json_to_sql(&json!({"a": 1}), ColumnType::Text),
            SqlValue::Text("{\"a\":1}".to_string())
        );
        assert_eq!(json_to_sql(&json!(2.5), ColumnType::Real), SqlValue::Real(2.5));
    }
}
