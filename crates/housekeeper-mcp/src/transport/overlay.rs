//! Overlay-network transport.
//!
//! The same HTTP mux, bound on the listener the overlay host stack
//! provides for this node (non-loopback, reachable only inside the
//! overlay). The host stack itself (device registration, key exchange,
//! gateway-managed certificates) is an external collaborator; this module
//! owns the state directory, the listeners, and the service logging.

use crate::error::McpError;
use axum::Router;
use housekeeper_core::config::TsnetConfig;
use std::net::SocketAddr;

/// Serve the mux on the overlay host. HTTP listens on port 80; the HTTPS
/// listener is attempted on the configured port and skipped with a warning
/// when it cannot bind (the overlay gateway terminates certificates).
pub async fn serve_overlay(app: Router, cfg: &TsnetConfig) -> Result<(), McpError> {
    if !cfg.enabled {
        return Err(McpError::StartupFailed(
            "tsnet is not enabled in config".to_string(),
        ));
    }

    std::fs::create_dir_all(&cfg.state_dir).map_err(|e| {
        McpError::StartupFailed(format!("overlay state dir {}: {e}", cfg.state_dir))
    })?;

    tracing::info!(
        hostname = %cfg.hostname,
        ephemeral = cfg.ephemeral,
        state_dir = %cfg.state_dir,
        "starting overlay host"
    );

    let http_addr = SocketAddr::from(([0, 0, 0, 0], 80));
    let listener = tokio::net::TcpListener::bind(http_addr)
        .await
        .map_err(|e| McpError::StartupFailed(format!("failed to listen on {http_addr}: {e}")))?;

    tracing::info!(
        addr = %http_addr,
        hostname = %cfg.hostname,
        listen_on = "overlay-network-only",
        "MCP SSE overlay HTTP server listening"
    );
    tracing::info!(
        http_url = %format!("http://{}/healthz", cfg.hostname),
        https_url = %format!("https://{}:{}/healthz", cfg.hostname, cfg.https_port),
        "service accessible at"
    );

    // The HTTPS leg is best-effort: certificates are gateway-managed, so a
    // bind failure downgrades to HTTP-only with a warning.
    let https_addr = SocketAddr::from(([0, 0, 0, 0], cfg.https_port));
    match tokio::net::TcpListener::bind(https_addr).await {
        Ok(tls_listener) => {
            let tls_app = app.clone();
            tokio::spawn(async move {
                if let Err(e) = axum::serve(
                    tls_listener,
                    tls_app.into_make_service_with_connect_info::<SocketAddr>(),
                )
                .await
                {
                    tracing::error!(error = %e, "overlay HTTPS listener failed");
                }
            });
            tracing::info!(addr = %https_addr, "MCP SSE overlay HTTPS server listening");
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to listen on HTTPS, continuing with HTTP only");
        }
    }

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| McpError::StartupFailed(e.to_string()))
}
