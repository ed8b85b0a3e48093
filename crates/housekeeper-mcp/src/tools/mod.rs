//! Tool registry.
//!
//! Tools are registered once at server start and immutable afterwards. A
//! tool pairs its wire definition (name, schema, annotations) with an async
//! handler; handlers return a structured result object plus a short text
//! rendering for the chat surface.

mod clickhouse;
mod prometheus;

pub use clickhouse::clickhouse_query_tool;
pub use prometheus::prometheus_query_tool;

use crate::error::McpError;
use crate::protocol::ToolDefinition;
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// What a tool handler produces: a structured result and its text form.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub structured: Value,
    pub text: String,
}

type ToolHandler = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<ToolOutput, McpError>> + Send + Sync>;

/// A registered tool: definition plus handler.
#[derive(Clone)]
pub struct Tool {
    pub definition: ToolDefinition,
    handler: ToolHandler,
}

impl Tool {
    pub fn new<F>(definition: ToolDefinition, handler: F) -> Self
    where
        F: Fn(Value) -> BoxFuture<'static, Result<ToolOutput, McpError>> + Send + Sync + 'static,
    {
        Self {
            definition,
            handler: Arc::new(handler),
        }
    }

    /// Invoke the tool with a raw argument object.
    pub async fn invoke(&self, arguments: Value) -> Result<ToolOutput, McpError> {
        (self.handler)(arguments).await
    }
}

/// Registry of available MCP tools.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    /// Create a new empty tool registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool.
    pub fn register(&mut self, tool: Tool) {
        self.tools.insert(tool.definition.name.clone(), tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    /// List all tool definitions.
    pub fn list(&self) -> Vec<&ToolDefinition> {
        self.tools.values().map(|t| &t.definition).collect()
    }

    /// Registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
