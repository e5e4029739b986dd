//! Conversions between dbclient values and SQLite storage classes

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use dbclient_core::{DbClientError, DbType, Result, Value};
use rusqlite::types::{Value as SqlValue, ValueRef};
use uuid::Uuid;

/// Convert a parameter value for binding, coercing it to `db_type` when one is given
pub(crate) fn to_sql(value: &Value, db_type: Option<DbType>) -> Result<SqlValue> {
    if value.is_null() {
        return Ok(SqlValue::Null);
    }

    let Some(db_type) = db_type else {
        return natural(value);
    };

    let coerced = match db_type {
        DbType::Boolean => value.as_bool().map(|b| SqlValue::Integer(b as i64)),
        DbType::Int32 | DbType::Int64 => value.as_i64().map(SqlValue::Integer),
        DbType::Double => value.as_f64().map(SqlValue::Real),
        DbType::Binary => match value {
            Value::Bytes(b) => Some(SqlValue::Blob(b.clone())),
            Value::String(s) => Some(SqlValue::Blob(s.as_bytes().to_vec())),
            _ => None,
        },
        DbType::Decimal
        | DbType::String
        | DbType::AnsiString
        | DbType::Guid
        | DbType::Date
        | DbType::Time
        | DbType::DateTime
        | DbType::Json => as_text(value).map(SqlValue::Text),
    };

    coerced.ok_or_else(|| {
        DbClientError::Driver(format!("Cannot bind value '{}' as {:?}", value, db_type))
    })
}

fn natural(value: &Value) -> Result<SqlValue> {
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(if *b { 1 } else { 0 }),
        Value::Int32(i) => SqlValue::Integer(*i as i64),
        Value::Int64(i) => SqlValue::Integer(*i),
        Value::Float64(f) => SqlValue::Real(*f),
        Value::Decimal(d) => SqlValue::Text(d.clone()),
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Bytes(b) => SqlValue::Blob(b.clone()),
        Value::Date(d) => SqlValue::Text(d.to_string()),
        Value::Time(t) => SqlValue::Text(t.to_string()),
        Value::DateTime(dt) => SqlValue::Text(dt.to_string()),
        Value::DateTimeUtc(dt) => SqlValue::Text(dt.to_rfc3339()),
        Value::Json(j) => SqlValue::Text(j.to_string()),
        Value::Uuid(u) => SqlValue::Text(u.to_string()),
        Value::Array(_) => {
            return Err(DbClientError::Driver(
                "A sequence cannot be bound to a single parameter".into(),
            ));
        }
    })
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bytes(_) | Value::Array(_) => None,
        Value::DateTimeUtc(dt) => Some(dt.to_rfc3339()),
        other => Some(other.to_string()),
    }
}

/// Convert column `idx` of a result row, using the declared column type to
/// recover values SQLite stores as text or integers
pub(crate) fn from_sql(row: &rusqlite::Row, idx: usize, decl_type: &str) -> Result<Value> {
    let value_ref = row
        .get_ref(idx)
        .map_err(|e| DbClientError::Driver(format!("Failed to read column {}: {}", idx, e)))?;

    let declared = decl_type.to_ascii_uppercase();
    let value = match value_ref {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) if matches!(declared.as_str(), "BOOLEAN" | "BOOL") => {
            Value::Bool(i != 0)
        }
        ValueRef::Integer(i) => Value::Int64(i),
        ValueRef::Real(f) => Value::Float64(f),
        ValueRef::Text(s) => text_value(&String::from_utf8_lossy(s), &declared),
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    };

    Ok(value)
}

fn text_value(text: &str, declared: &str) -> Value {
    let parsed = match declared {
        "DATE" => NaiveDate::parse_from_str(text, "%Y-%m-%d").ok().map(Value::Date),
        "TIME" => NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
            .ok()
            .map(Value::Time),
        "DATETIME" | "TIMESTAMP" => parse_datetime(text),
        "UUID" | "GUID" | "UNIQUEIDENTIFIER" => Uuid::parse_str(text).ok().map(Value::Uuid),
        "JSON" => serde_json::from_str(text).ok().map(Value::Json),
        _ => None,
    };
    parsed.unwrap_or_else(|| Value::String(text.to_string()))
}

fn parse_datetime(text: &str) -> Option<Value> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(Value::DateTimeUtc(dt.with_timezone(&Utc)));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(Value::DateTime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_natural_conversion() {
        assert_eq!(to_sql(&Value::Bool(true), None).unwrap(), SqlValue::Integer(1));
        assert_eq!(to_sql(&Value::Int32(7), None).unwrap(), SqlValue::Integer(7));
        assert_eq!(
            to_sql(&Value::from("a"), None).unwrap(),
            SqlValue::Text("a".into())
        );
        assert_eq!(to_sql(&Value::Null, Some(DbType::Int32)).unwrap(), SqlValue::Null);
    }

    #[rstest]
    #[case(Value::from("42"), DbType::Int64, SqlValue::Integer(42))]
    #[case(Value::Int32(3), DbType::Double, SqlValue::Real(3.0))]
    #[case(Value::Int64(1), DbType::Boolean, SqlValue::Integer(1))]
    #[case(Value::Int32(5), DbType::String, SqlValue::Text("5".into()))]
    #[case(Value::from("ab"), DbType::Binary, SqlValue::Blob(b"ab".to_vec()))]
    fn test_type_hint_coercion(#[case] value: Value, #[case] db_type: DbType, #[case] expected: SqlValue) {
        assert_eq!(to_sql(&value, Some(db_type)).unwrap(), expected);
    }

    #[test]
    fn test_failed_coercion_is_driver_error() {
        let err = to_sql(&Value::from("abc"), Some(DbType::Int32)).unwrap_err();
        assert!(err.is_driver());
    }

    #[test]
    fn test_nested_sequence_rejected() {
        let err = to_sql(&Value::Array(vec![Value::Int32(1)]), None).unwrap_err();
        assert!(err.is_driver());
    }

    #[test]
    fn test_text_values_use_declared_type() {
        assert_eq!(
            text_value("2024-02-29", "DATE"),
            Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        );
        assert!(matches!(
            text_value("2024-02-29 10:30:00", "DATETIME"),
            Value::DateTime(_)
        ));
        assert!(matches!(
            text_value("2024-02-29T10:30:00+00:00", "TIMESTAMP"),
            Value::DateTimeUtc(_)
        ));
        assert!(matches!(text_value(r#"{"a":1}"#, "JSON"), Value::Json(_)));
        assert_eq!(text_value("not a date", "DATE"), Value::from("not a date"));
        assert_eq!(text_value("x", "TEXT"), Value::from("x"));
    }
}
