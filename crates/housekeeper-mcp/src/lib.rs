//! # housekeeper-mcp
//!
//! MCP (Model Context Protocol) engine and transports for the Housekeeper
//! query gateway.
//!
//! The engine holds an immutable registry of schema-described, read-only
//! tools (`clickhouse_query`, `prometheus_query`) and dispatches JSON-RPC
//! requests to them. Three transports expose the same engine:
//!
//! - newline-delimited JSON-RPC on stdin/stdout (one request in flight,
//!   responses in request order, telemetry on stderr),
//! - an HTTP server whose SSE handler pairs a long-lived event stream with
//!   a per-session POST endpoint, optionally with a TLS listener,
//! - the same HTTP mux bound on an overlay-network listener.

pub mod error;
pub mod protocol;
pub mod server;
pub mod session;
pub mod summarize;
pub mod tools;
pub mod transport;

pub use error::McpError;
pub use protocol::{JsonRpcRequest, JsonRpcResponse, ToolAnnotations, ToolDefinition};
pub use server::McpServer;
pub use summarize::summarize_rows;
pub use tools::{Tool, ToolOutput, ToolRegistry};
