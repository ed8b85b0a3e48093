//! Error types for the MCP crate.

use thiserror::Error;

/// Errors that can occur in the MCP engine and transports.
#[derive(Debug, Error)]
pub enum McpError {
    /// Failed to start a transport.
    #[error("failed to start MCP server: {0}")]
    StartupFailed(String),

    /// Invalid request format.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Tool not found.
    #[error("tool not found: {name}")]
    ToolNotFound { name: String },

    /// Invalid arguments for a tool (schema violation or policy rejection).
    #[error("{0}")]
    InvalidArguments(String),

    /// The database or metrics backend returned an error.
    #[error("{0}")]
    Upstream(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl McpError {
    /// The JSON-RPC error code for this failure.
    pub fn code(&self) -> i32 {
        match self {
            McpError::InvalidRequest(_) | McpError::InvalidArguments(_) => -32602,
            McpError::ToolNotFound { .. } => -32601,
            _ => -32603,
        }
    }
}
