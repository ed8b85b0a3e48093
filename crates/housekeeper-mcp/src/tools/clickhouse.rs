//! The `clickhouse_query` tool.

use crate::error::McpError;
use crate::protocol::{ToolAnnotations, ToolDefinition};
use crate::summarize::summarize_rows;
use crate::tools::{Tool, ToolOutput};
use housekeeper_clickhouse::{build_structured_sql, ClickhouseClient};
use housekeeper_core::config::ClickhouseConfig;
use housekeeper_policy::{
    validate_freeform_sql, validate_structured, AllowedDatabases, StructuredQuery,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Wire arguments of the database tool. One of two shapes: structured
/// (table plus fragments) or free-form (`sql`). Unknown fields are
/// rejected.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields, default)]
struct QueryArgs {
    table: String,
    columns: Vec<String>,
    #[serde(rename = "where")]
    where_clause: String,
    order_by: String,
    limit: i64,
    sql: String,
}

fn input_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "table": {
                "type": "string",
                "description": "Table to query as database.name, e.g. system.query_log"
            },
            "columns": {
                "type": "array",
                "items": {"type": "string"},
                "description": "Columns to select; empty selects all"
            },
            "where": {
                "type": "string",
                "description": "WHERE expression without the keyword"
            },
            "order_by": {
                "type": "string",
                "description": "ORDER BY expression without the keyword"
            },
            "limit": {
                "type": "integer",
                "minimum": 0,
                "description": "Row limit; 0 means unlimited"
            },
            "sql": {
                "type": "string",
                "description": "Free-form single SELECT/WITH statement; overrides the structured fields"
            }
        },
        "additionalProperties": false
    })
}

/// Build the `clickhouse_query` tool over the given connection settings.
pub fn clickhouse_query_tool(cfg: ClickhouseConfig) -> Tool {
    let allowed = Arc::new(AllowedDatabases::new(&cfg.allowed_databases));
    let client = ClickhouseClient::new(cfg.clone());
    let cluster = cfg.cluster.clone();
    let system_database = cfg.database.clone();

    let definition = ToolDefinition {
        name: "clickhouse_query".to_string(),
        title: Some("Query ClickHouse system tables".to_string()),
        description: Some(
            "Read-only queries against allowed ClickHouse databases via clusterAllReplicas"
                .to_string(),
        ),
        input_schema: input_schema(),
        annotations: Some(ToolAnnotations {
            read_only_hint: Some(true),
        }),
    };

    Tool::new(definition, move |arguments| {
        let allowed = allowed.clone();
        let client = client.clone();
        let cluster = cluster.clone();
        let system_database = system_database.clone();
        Box::pin(async move {
            let args: QueryArgs = serde_json::from_value(arguments)
                .map_err(|e| McpError::InvalidArguments(format!("invalid arguments: {e}")))?;

            let freeform = !args.sql.trim().is_empty();
            tracing::info!(
                mode = if freeform { "sql" } else { "structured" },
                table = %args.table,
                "clickhouse_query invoked"
            );

            let query = if freeform {
                validate_freeform_sql(&args.sql, &allowed)
                    .map_err(|e| McpError::InvalidArguments(e.to_string()))?;
                args.sql.clone()
            } else {
                let structured = StructuredQuery {
                    table: args.table,
                    columns: args.columns,
                    where_clause: args.where_clause,
                    order_by: args.order_by,
                    limit: args.limit,
                };
                validate_structured(&structured, &allowed)
                    .map_err(|e| McpError::InvalidArguments(e.to_string()))?;
                build_structured_sql(&structured, &cluster, &system_database)
            };

            let rows = client
                .query(&query)
                .await
                .map_err(|e| McpError::Upstream(e.to_string()))?;

            tracing::info!(rows = rows.len(), "clickhouse_query completed");
            let text = summarize_rows(&rows);
            let structured = json!({
                "results": rows,
                "count": rows.len(),
            });
            Ok(ToolOutput { structured, text })
        })
    })
}
