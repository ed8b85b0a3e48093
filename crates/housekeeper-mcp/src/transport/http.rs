//! HTTP + SSE transport.
//!
//! One process-wide mux. The SSE handler opens a GET `text/event-stream`
//! whose first event is `endpoint`, carrying the per-session POST URL;
//! JSON-RPC requests POSTed there are answered as `message` events on the
//! long-lived stream (the POST itself returns 202). Requests from distinct
//! sessions run concurrently; frames within a session are serialized on
//! its stream.

use crate::error::McpError;
use crate::protocol::JsonRpcRequest;
use crate::server::McpServer;
use crate::session::SessionStore;
use crate::transport::http_log::log_requests;
use crate::transport::tls::rustls_config;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use housekeeper_core::config::{OauthConfig, SseConfig};
use housekeeper_oauth::{cors::cors, require_auth, router as oauth_router, Authority};
use serde::Deserialize;
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Shared state of the HTTP transport: engines routed by path prefix plus
/// the live SSE sessions. Only the default prefix is populated today; the
/// map is the extension point for further MCP server instances.
pub struct HttpTransportState {
    engines: HashMap<String, Arc<McpServer>>,
    default_engine: Arc<McpServer>,
    sessions: SessionStore,
}

impl HttpTransportState {
    fn engine_for(&self, path: &str) -> Arc<McpServer> {
        for (prefix, engine) in &self.engines {
            if path.starts_with(prefix.as_str()) {
                return engine.clone();
            }
        }
        self.default_engine.clone()
    }
}

/// Build the HTTP mux: SSE endpoints, the session POST endpoint, health,
/// and (when enabled) the OAuth authority, all behind CORS, request
/// logging, and the auth gate.
pub fn build_router(engine: Arc<McpServer>, authority: Option<Arc<Authority>>) -> Router {
    let state = Arc::new(HttpTransportState {
        engines: HashMap::from([("/clickhouse".to_string(), engine.clone())]),
        default_engine: engine,
        sessions: SessionStore::new(),
    });

    let mut app = Router::new()
        .route("/healthz", get(healthz))
        .route("/sse", get(sse_handler))
        .route("/clickhouse/sse", get(sse_handler))
        .route("/message", post(message_handler))
        .with_state(state);

    if let Some(authority) = authority {
        let oauth_cfg: &OauthConfig = authority.config();
        let required = oauth_cfg.required;
        app = app.merge(oauth_router(authority.clone()));
        if required {
            app = app.layer(axum::middleware::from_fn_with_state(
                authority,
                require_auth,
            ));
        }
    }

    app.layer(axum::middleware::from_fn(cors))
        .layer(axum::middleware::from_fn(log_requests))
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct SessionQuery {
    session_id: String,
}

/// Open the long-lived event stream for a session.
async fn sse_handler(
    State(state): State<Arc<HttpTransportState>>,
) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>>> {
    let (session_id, mut rx) = state.sessions.open().await;
    tracing::info!(session_id = %session_id, "SSE session opened");

    let endpoint = format!("/message?session_id={session_id}");
    let stream = async_stream::stream! {
        yield Ok::<_, Infallible>(Event::default().event("endpoint").data(endpoint));
        while let Some(frame) = rx.recv().await {
            yield Ok(Event::default().event("message").data(frame));
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("ping"),
    )
}

/// Accept a JSON-RPC request for a session. The response is emitted on the
/// session's event stream; the POST acknowledges with 202. Processing runs
/// on its own task, so a slow stream consumer does not block admission.
async fn message_handler(
    State(state): State<Arc<HttpTransportState>>,
    Query(query): Query<SessionQuery>,
    uri: axum::http::Uri,
    Json(request): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    let session_id = query.session_id;
    let Some(tx) = state.sessions.sender(&session_id).await else {
        return (StatusCode::NOT_FOUND, "unknown session");
    };

    let engine = state.engine_for(uri.path());
    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let Some(response) = engine.handle_request(request).await else {
            return;
        };
        match serde_json::to_string(&response) {
            Ok(frame) => {
                if tx.send(frame).await.is_err() {
                    // Stream consumer went away; drop the session.
                    sessions.close(&session_id).await;
                }
            }
            Err(e) => tracing::error!(error = %e, "failed to serialize response frame"),
        }
    });

    (StatusCode::ACCEPTED, "Accepted")
}

/// Serve the mux on a plain TCP listener.
pub async fn serve_http(app: Router, port: u16) -> Result<(), McpError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| McpError::StartupFailed(format!("failed to bind to port {port}: {e}")))?;
    tracing::info!(addr = %addr, "MCP SSE HTTP server listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| McpError::StartupFailed(e.to_string()))
}

/// Serve the same mux on the TLS listener.
pub async fn serve_https(app: Router, cfg: &SseConfig) -> Result<(), McpError> {
    let tls = rustls_config(&cfg.tls).await?;
    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.tls.port));
    tracing::info!(addr = %addr, "MCP SSE HTTPS server listening");
    axum_server::bind_rustls(addr, tls)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .map_err(|e| McpError::StartupFailed(e.to_string()))
}
