//! Result summarizer: compact, human-friendly text for a chat surface.
//!
//! - 0 rows: `no rows`
//! - 1 row: one line of key-sorted `key=value` pairs
//! - 2..=5 rows: one such line per row
//! - more: `rows: N` and a preview of the first row
//!
//! Numeric values get unit-aware rendering keyed on the column name:
//! durations for `*second*` columns (with the sub-second units shown
//! alongside their seconds conversion) and binary-prefix sizes for byte
//! columns.

use housekeeper_clickhouse::Row;
use serde_json::Value;

/// Render a compact summary of a result set.
pub fn summarize_rows(rows: &[Row]) -> String {
    match rows.len() {
        0 => "no rows".to_string(),
        1 => format_row(&rows[0]),
        2..=5 => rows
            .iter()
            .map(format_row)
            .collect::<Vec<_>>()
            .join("\n"),
        n => format!("rows: {n}\nfirst: {}", format_row(&rows[0])),
    }
}

/// One row as space-separated `key=value` pairs in stable key order.
fn format_row(row: &Row) -> String {
    let mut keys: Vec<&String> = row.keys().collect();
    keys.sort();
    keys.iter()
        .map(|k| format!("{k}={}", pretty_value(k, &row[k.as_str()])))
        .collect::<Vec<_>>()
        .join(" ")
}

fn pretty_value(key: &str, value: &Value) -> String {
    let lkey = key.to_lowercase();
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => {
            let Some(f) = n.as_f64() else {
                return n.to_string();
            };
            pretty_numeric_with_units(&lkey, f)
        }
        other => other.to_string(),
    }
}

fn pretty_numeric_with_units(lkey: &str, val: f64) -> String {
    // Sub-second units carry "second" as a substring, so they go first.
    if lkey.contains("microsecond") {
        return format!("{val:.0}µs ({:.3}s)", val / 1_000_000.0);
    }
    if lkey.contains("millisecond") {
        return format!("{val:.0}ms ({:.3}s)", val / 1_000.0);
    }
    if lkey.contains("nanosecond") {
        return format!("{val:.0}ns ({:.3}s)", val / 1_000_000_000.0);
    }
    if lkey.contains("second") {
        return format!("{}s", trim_float(val));
    }
    if lkey.contains("bytes") {
        return human_bytes(val);
    }
    trim_float(val)
}

/// Integral values render without a fractional part; fractional values
/// render to six significant digits; NaN and infinities render literally.
fn trim_float(val: f64) -> String {
    if val.is_nan() || val.is_infinite() {
        return format!("{val}");
    }
    if val == val.trunc() {
        return format!("{val:.0}");
    }
    let rounded = format!("{val:.5e}");
    rounded
        .parse::<f64>()
        .map(|v| format!("{v}"))
        .unwrap_or(rounded)
}

/// Binary-prefix rendering up to PB; two fractional digits from KB up.
fn human_bytes(val: f64) -> String {
    if val < 1024.0 {
        return format!("{val:.0} B");
    }
    let units = ["KB", "MB", "GB", "TB", "PB"];
    let mut v = val / 1024.0;
    let mut i = 0;
    while v >= 1024.0 && i < units.len() - 1 {
        v /= 1024.0;
        i += 1;
    }
    format!("{v:.2} {}", units[i])
}
