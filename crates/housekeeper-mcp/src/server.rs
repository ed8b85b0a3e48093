//! MCP engine: request dispatch over the tool registry.

use crate::protocol::{CallToolParams, JsonRpcRequest, JsonRpcResponse};
use crate::tools::ToolRegistry;
use serde_json::{json, Value};

/// MCP protocol revision implemented by this server.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// The MCP server: an immutable tool registry plus dispatch.
pub struct McpServer {
    tools: ToolRegistry,
}

impl McpServer {
    /// Create the server over a fully populated registry. The registry is
    /// immutable for the process lifetime.
    pub fn new(tools: ToolRegistry) -> Self {
        Self { tools }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Handle a JSON-RPC request. Notifications (no id) produce no
    /// response.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let id = request.id.clone();

        if id.is_none() {
            // Notifications: acknowledge silently.
            tracing::debug!(method = %request.method, "notification received");
            return None;
        }

        Some(match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => self.handle_list_tools(id),
            "tools/call" => self.handle_call_tool(id, request.params).await,
            _ => JsonRpcResponse::error(
                id,
                -32601,
                format!("Method not found: {}", request.method),
            ),
        })
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        let result = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "serverInfo": {
                "name": "housekeeper-clickhouse-mcp",
                "title": "Housekeeper ClickHouse",
                "version": env!("CARGO_PKG_VERSION")
            },
            "capabilities": {
                "tools": {}
            }
        });
        JsonRpcResponse::success(id, result)
    }

    fn handle_list_tools(&self, id: Option<Value>) -> JsonRpcResponse {
        let tools: Vec<Value> = self
            .tools
            .list()
            .into_iter()
            .map(|t| serde_json::to_value(t).unwrap_or(Value::Null))
            .collect();
        JsonRpcResponse::success(id, json!({ "tools": tools }))
    }

    async fn handle_call_tool(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: CallToolParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(id, -32602, format!("Invalid params: {e}"))
                }
            },
            None => return JsonRpcResponse::error(id, -32602, "Missing params"),
        };

        let Some(tool) = self.tools.get(&params.name) else {
            return JsonRpcResponse::error(id, -32602, format!("Tool not found: {}", params.name));
        };

        match tool.invoke(params.arguments).await {
            Ok(output) => {
                let result = json!({
                    "content": [{"type": "text", "text": output.text}],
                    "structuredContent": output.structured,
                    "isError": false
                });
                JsonRpcResponse::success(id, result)
            }
            Err(e) => {
                tracing::warn!(tool = %params.name, error = %e, "tool call failed");
                JsonRpcResponse::error(id, e.code(), e.to_string())
            }
        }
    }
}
