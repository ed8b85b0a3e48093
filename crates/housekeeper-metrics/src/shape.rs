//! Result shaping for range queries.

use serde_json::{json, Map, Value};

/// Shape a `/api/v1/query_range` result.
///
/// Matrix results become `{ raw_result, last_values }` where `last_values`
/// holds the final sample of each series as `{ metric, value, time }`.
/// Non-matrix results (scalar, vector) pass through unchanged, as does an
/// empty matrix.
pub fn shape_range_result(data: &Value) -> Value {
    let result_type = data.get("resultType").and_then(Value::as_str);
    if result_type != Some("matrix") {
        return data.clone();
    }
    let Some(series_list) = data.get("result").and_then(Value::as_array) else {
        return data.clone();
    };
    if series_list.is_empty() {
        return data.clone();
    }

    let mut last_values = Vec::with_capacity(series_list.len());
    for series in series_list {
        let Some(values) = series.get("values").and_then(Value::as_array) else {
            continue;
        };
        let Some(last) = values.last().and_then(Value::as_array) else {
            continue;
        };
        let metric = series.get("metric").cloned().unwrap_or(Value::Null);
        let time = last.first().cloned().unwrap_or(Value::Null);
        let value = last
            .get(1)
            .map(parse_sample_value)
            .unwrap_or(Value::Null);
        last_values.push(json!({
            "metric": metric,
            "value": value,
            "time": time,
        }));
    }

    let mut shaped = Map::new();
    shaped.insert("raw_result".to_string(), data.clone());
    shaped.insert("last_values".to_string(), Value::Array(last_values));
    Value::Object(shaped)
}

/// Prometheus serializes sample values as strings; render them numeric when
/// they parse, keeping `NaN`/`Inf` literal.
fn parse_sample_value(v: &Value) -> Value {
    let Some(s) = v.as_str() else {
        return v.clone();
    };
    match s.parse::<f64>() {
        Ok(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or_else(|| v.clone()),
        Err(_) => v.clone(),
    }
}
