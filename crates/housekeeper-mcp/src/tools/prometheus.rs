//! The `prometheus_query` tool.

use crate::error::McpError;
use crate::protocol::{ToolAnnotations, ToolDefinition};
use crate::tools::{Tool, ToolOutput};
use housekeeper_core::config::PrometheusConfig;
use housekeeper_metrics::{MetricsError, PrometheusClient};
use serde::Deserialize;
use serde_json::{json, Value};

/// Wire arguments of the metrics tool. Unknown fields are rejected.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields, default)]
struct PrometheusArgs {
    query: String,
    start: String,
    end: String,
    step: String,
}

fn input_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": "PromQL query string"
            },
            "start": {
                "type": "string",
                "description": "Start time: RFC 3339 instant or relative duration like -1h"
            },
            "end": {
                "type": "string",
                "description": "End time: RFC 3339 instant or relative duration; defaults to now"
            },
            "step": {
                "type": "string",
                "description": "Step duration, e.g. 15s, 1m, 1h"
            }
        },
        "required": ["query"],
        "additionalProperties": false
    })
}

fn map_error(e: MetricsError) -> McpError {
    match e {
        MetricsError::EmptyQuery
        | MetricsError::InvalidTime { .. }
        | MetricsError::StartAfterEnd
        | MetricsError::InvalidStep(_) => McpError::InvalidArguments(e.to_string()),
        other => McpError::Upstream(other.to_string()),
    }
}

/// Render the text summary: one `metric: value` line per series when last
/// values are available, the raw payload otherwise.
fn summarize(result: &Value) -> String {
    if let Some(last_values) = result.get("last_values").and_then(Value::as_array) {
        if !last_values.is_empty() {
            return last_values
                .iter()
                .map(|entry| {
                    format!(
                        "{}: {}",
                        entry.get("metric").cloned().unwrap_or(Value::Null),
                        entry.get("value").cloned().unwrap_or(Value::Null)
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
        }
    }
    if let Some(raw) = result.get("raw_result") {
        return raw.to_string();
    }
    "Query returned data in non-matrix format".to_string()
}

/// Build the `prometheus_query` tool over the shared metrics client.
pub fn prometheus_query_tool(cfg: &PrometheusConfig) -> Result<Tool, McpError> {
    let client = PrometheusClient::new(cfg)
        .map_err(|e| McpError::StartupFailed(format!("prometheus client: {e}")))?;

    let definition = ToolDefinition {
        name: "prometheus_query".to_string(),
        title: Some("Query Prometheus metrics".to_string()),
        description: Some("Execute PromQL range queries against Prometheus metrics".to_string()),
        input_schema: input_schema(),
        annotations: Some(ToolAnnotations {
            read_only_hint: Some(true),
        }),
    };

    Ok(Tool::new(definition, move |arguments| {
        let client = client.clone();
        Box::pin(async move {
            let args: PrometheusArgs = serde_json::from_value(arguments)
                .map_err(|e| McpError::InvalidArguments(format!("invalid arguments: {e}")))?;
            if args.query.is_empty() {
                return Err(McpError::InvalidArguments("query is required".to_string()));
            }

            tracing::info!(query = %args.query, "prometheus_query invoked");
            let result = client
                .query_range(&args.query, &args.start, &args.end, &args.step)
                .await
                .map_err(map_error)?;

            let text = summarize(&result);
            Ok(ToolOutput {
                structured: json!({ "result": result }),
                text,
            })
        })
    }))
}
