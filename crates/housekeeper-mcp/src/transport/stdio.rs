//! Newline-delimited JSON-RPC over stdin/stdout.
//!
//! One serial request-response loop: responses are written in request
//! order, and standard output carries nothing but protocol frames (all
//! telemetry goes to stderr via the logging setup).

use crate::error::McpError;
use crate::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::server::McpServer;
use std::io::Write;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;

/// Run the stdio transport until stdin closes.
pub async fn run_stdio(engine: Arc<McpServer>) -> Result<(), McpError> {
    tracing::info!("MCP stdio server ready");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let stdout = std::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<JsonRpcRequest>(&line) {
            Ok(request) => engine.handle_request(request).await,
            Err(e) => Some(JsonRpcResponse::error(
                None,
                -32700,
                format!("Parse error: {e}"),
            )),
        };

        if let Some(response) = response {
            let text = serde_json::to_string(&response)?;
            let mut lock = stdout.lock();
            writeln!(lock, "{text}")?;
            lock.flush()?;
        }
    }

    tracing::info!("stdin closed, MCP stdio server exiting");
    Ok(())
}
