//! Transports exposing the MCP engine.

mod http;
mod http_log;
mod overlay;
mod stdio;
mod tls;

pub use http::{build_router, serve_http, serve_https};
pub use overlay::serve_overlay;
pub use stdio::run_stdio;
pub use tls::rustls_config;
