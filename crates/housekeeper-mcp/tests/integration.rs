//! Engine-level integration: the real tool registry behind the JSON-RPC
//! dispatch, exercised without a live backend (policy rejections happen
//! before any connection is opened).

use housekeeper_core::config::{ClickhouseConfig, PrometheusConfig};
use housekeeper_mcp::tools::{clickhouse_query_tool, prometheus_query_tool};
use housekeeper_mcp::{JsonRpcRequest, McpServer, ToolRegistry};
use serde_json::{json, Value};

fn engine() -> McpServer {
    let mut registry = ToolRegistry::new();
    registry.register(clickhouse_query_tool(ClickhouseConfig::default()));
    registry.register(prometheus_query_tool(&PrometheusConfig::default()).unwrap());
    McpServer::new(registry)
}

fn request(id: i64, method: &str, params: Value) -> JsonRpcRequest {
    JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        id: Some(json!(id)),
        method: method.to_string(),
        params: Some(params),
    }
}

#[tokio::test]
async fn test_initialize_then_list_tools() {
    let engine = engine();

    let response = engine
        .handle_request(request(1, "initialize", json!({})))
        .await
        .unwrap();
    let result = response.result.unwrap();
    assert_eq!(result["protocolVersion"], "2024-11-05");

    let response = engine
        .handle_request(request(2, "tools/list", json!({})))
        .await
        .unwrap();
    let tools = response.result.unwrap()["tools"].as_array().unwrap().clone();
    let mut names: Vec<&str> = tools
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    names.sort();
    assert_eq!(names, vec!["clickhouse_query", "prometheus_query"]);
    for tool in &tools {
        assert_eq!(tool["annotations"]["readOnlyHint"], json!(true));
        assert!(tool["inputSchema"].is_object());
    }
}

#[tokio::test]
async fn test_call_with_policy_violation_is_protocol_error() {
    let engine = engine();

    let response = engine
        .handle_request(request(
            1,
            "tools/call",
            json!({
                "name": "clickhouse_query",
                "arguments": {"sql": "SELECT 1; DROP TABLE users"}
            }),
        ))
        .await
        .unwrap();
    // A rejection is a protocol error with the message; no structured
    // content is attached.
    assert!(response.result.is_none());
    let error = response.error.unwrap();
    assert_eq!(error.code, -32602);
    assert!(error.message.contains("multiple statements"));
}

#[tokio::test]
async fn test_call_with_foreign_schema_is_rejected() {
    let engine = engine();

    let response = engine
        .handle_request(request(
            1,
            "tools/call",
            json!({
                "name": "clickhouse_query",
                "arguments": {"sql": "SELECT * FROM users.data"}
            }),
        ))
        .await
        .unwrap();
    let error = response.error.unwrap();
    assert!(error.message.contains("only tables from allowed databases"));
}

#[tokio::test]
async fn test_call_with_unknown_argument_field() {
    let engine = engine();

    let response = engine
        .handle_request(request(
            1,
            "tools/call",
            json!({
                "name": "prometheus_query",
                "arguments": {"query": "up", "surprise": 1}
            }),
        ))
        .await
        .unwrap();
    let error = response.error.unwrap();
    assert_eq!(error.code, -32602);
}

#[tokio::test]
async fn test_requests_answer_in_order() {
    let engine = engine();
    for i in 0..4 {
        let response = engine
            .handle_request(request(i, "tools/list", json!({})))
            .await
            .unwrap();
        assert_eq!(response.id, Some(json!(i)));
    }
}
