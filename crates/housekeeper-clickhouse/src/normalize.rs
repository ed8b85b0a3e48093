//! Row normalization: driver cells into JSON-safe values.
//!
//! A cell arrives as the JSON value ClickHouse produced for it, plus the
//! declared column type. Normalization makes the result self-describing for
//! a model client: timestamps become ISO-8601 strings with nanosecond
//! precision and a timezone designator, integers stay integers, containers
//! normalize recursively, and anything unrecognized degrades to its string
//! rendering. A nullable column contributes `null` or the normalized inner
//! value, never a typed zero.

use crate::types::ColumnType;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;

/// Normalize one cell according to its declared column type.
pub fn normalize_value(value: &Value, column_type: &ColumnType) -> Value {
    match column_type {
        ColumnType::Nullable(inner) => {
            if value.is_null() {
                Value::Null
            } else {
                normalize_value(value, inner)
            }
        }
        ColumnType::Text => match value {
            Value::String(_) => value.clone(),
            other => fallback(other),
        },
        ColumnType::Bool => match value {
            Value::Bool(_) => value.clone(),
            // Older servers render Bool as 0/1.
            Value::Number(n) => Value::Bool(n.as_i64().unwrap_or(0) != 0),
            other => fallback(other),
        },
        ColumnType::Int => match value {
            Value::Number(_) => value.clone(),
            // Strings appear when 64-bit quoting is on at the server.
            Value::String(s) => s
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| fallback(value)),
            other => fallback(other),
        },
        ColumnType::UInt => match value {
            Value::Number(_) => value.clone(),
            Value::String(s) => s
                .parse::<u64>()
                .map(Value::from)
                .unwrap_or_else(|_| fallback(value)),
            other => fallback(other),
        },
        ColumnType::Float => match value {
            Value::Number(_) | Value::Null => value.clone(),
            Value::String(s) => match s.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
                Some(n) => Value::Number(n),
                None => fallback(value),
            },
            other => fallback(other),
        },
        ColumnType::DateTime => match value {
            Value::String(s) => Value::String(to_rfc3339(s)),
            other => fallback(other),
        },
        ColumnType::Array(inner) => match value {
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| normalize_value(item, inner))
                    .collect(),
            ),
            other => fallback(other),
        },
        ColumnType::Map(inner) => match value {
            Value::Object(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), normalize_value(v, inner)))
                    .collect(),
            ),
            other => fallback(other),
        },
        ColumnType::Other(_) => fallback(value),
    }
}

/// Stringified fallback for values the normalizer does not model.
fn fallback(value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::String(_) | Value::Bool(_) | Value::Number(_) => value.clone(),
        other => Value::String(other.to_string()),
    }
}

/// Render a ClickHouse date/datetime string as ISO-8601 with nanosecond
/// precision and a timezone designator. Server output carries no offset, so
/// UTC is assumed. Unparseable strings pass through unchanged.
fn to_rfc3339(s: &str) -> String {
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc)
                .to_rfc3339_opts(SecondsFormat::Nanos, true);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc)
                .to_rfc3339_opts(SecondsFormat::Nanos, true);
        }
    }
    s.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_passes_through_nullable() {
        let ty = ColumnType::parse("Nullable(UInt64)");
        assert_eq!(normalize_value(&Value::Null, &ty), Value::Null);
    }

    #[test]
    fn test_nullable_inner_value() {
        let ty = ColumnType::parse("Nullable(UInt64)");
        assert_eq!(normalize_value(&json!(42), &ty), json!(42));
    }

    #[test]
    fn test_string_value() {
        let ty = ColumnType::parse("String");
        assert_eq!(normalize_value(&json!("test"), &ty), json!("test"));
    }

    #[test]
    fn test_bool_value() {
        let ty = ColumnType::parse("Bool");
        assert_eq!(normalize_value(&json!(true), &ty), json!(true));
        assert_eq!(normalize_value(&json!(1), &ty), json!(true));
        assert_eq!(normalize_value(&json!(0), &ty), json!(false));
    }

    #[test]
    fn test_integer_values() {
        assert_eq!(
            normalize_value(&json!(-123), &ColumnType::parse("Int64")),
            json!(-123)
        );
        assert_eq!(
            normalize_value(&json!(18446744073709551615u64), &ColumnType::parse("UInt64")),
            json!(18446744073709551615u64)
        );
    }

    #[test]
    fn test_quoted_64bit_integers() {
        assert_eq!(
            normalize_value(&json!("9007199254740993"), &ColumnType::parse("UInt64")),
            json!(9007199254740993u64)
        );
        assert_eq!(
            normalize_value(&json!("-42"), &ColumnType::parse("Int64")),
            json!(-42)
        );
    }

    #[test]
    fn test_float_value() {
        assert_eq!(
            normalize_value(&json!(123.45), &ColumnType::parse("Float64")),
            json!(123.45)
        );
    }

    #[test]
    fn test_datetime_value() {
        let ty = ColumnType::parse("DateTime");
        assert_eq!(
            normalize_value(&json!("2024-01-01 12:00:00"), &ty),
            json!("2024-01-01T12:00:00.000000000Z")
        );
    }

    #[test]
    fn test_datetime64_keeps_subsecond_precision() {
        let ty = ColumnType::parse("DateTime64(9)");
        assert_eq!(
            normalize_value(&json!("2024-01-01 12:00:00.123456789"), &ty),
            json!("2024-01-01T12:00:00.123456789Z")
        );
    }

    #[test]
    fn test_date_value() {
        let ty = ColumnType::parse("Date");
        assert_eq!(
            normalize_value(&json!("2024-06-15"), &ty),
            json!("2024-06-15T00:00:00.000000000Z")
        );
    }

    #[test]
    fn test_unparseable_datetime_passes_through() {
        let ty = ColumnType::parse("DateTime");
        assert_eq!(
            normalize_value(&json!("not a date"), &ty),
            json!("not a date")
        );
    }

    #[test]
    fn test_array_recursion() {
        let ty = ColumnType::parse("Array(Int64)");
        assert_eq!(
            normalize_value(&json!([1, 2, 3]), &ty),
            json!([1, 2, 3])
        );

        let ty = ColumnType::parse("Array(DateTime)");
        assert_eq!(
            normalize_value(&json!(["2024-01-01 00:00:00"]), &ty),
            json!(["2024-01-01T00:00:00.000000000Z"])
        );
    }

    #[test]
    fn test_map_recursion() {
        let ty = ColumnType::parse("Map(String, UInt64)");
        assert_eq!(
            normalize_value(&json!({"a": 1, "b": 2}), &ty),
            json!({"a": 1, "b": 2})
        );
    }

    #[test]
    fn test_unknown_type_fallback() {
        let ty = ColumnType::parse("AggregateFunction(sum, UInt64)");
        assert_eq!(normalize_value(&json!("raw"), &ty), json!("raw"));
        assert_eq!(
            normalize_value(&json!([1, 2]), &ty),
            json!("[1,2]")
        );
    }

    #[test]
    fn test_json_roundtrip_safety() {
        // Serialize-parse must return a structurally equal value.
        let cases = vec![
            (json!(null), ColumnType::parse("Nullable(String)")),
            (json!("x"), ColumnType::parse("String")),
            (json!(1u64), ColumnType::parse("UInt8")),
            (json!(-1), ColumnType::parse("Int8")),
            (json!(1.5), ColumnType::parse("Float32")),
            (json!([[1], [2, 3]]), ColumnType::parse("Array(Array(UInt8))")),
            (json!({"k": "2024-01-01 00:00:00"}), ColumnType::parse("Map(String, DateTime)")),
        ];
        for (value, ty) in cases {
            let normalized = normalize_value(&value, &ty);
            let text = serde_json::to_string(&normalized).unwrap();
            let reparsed: Value = serde_json::from_str(&text).unwrap();
            assert_eq!(normalized, reparsed);
        }
    }
}
