//! HTTP request logging.
//!
//! Every request is logged with method, path, query, remote, user-agent,
//! outcome status, bytes written, and duration. The Authorization header is
//! recorded only as a presence bit, never its value. Small JSON request
//! bodies are attached to the record in debug level only.

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Request};
use axum::middleware::Next;
use axum::response::Response;
use std::net::SocketAddr;
use std::time::Instant;

const BODY_LOG_LIMIT: u64 = 10 * 1024;

/// Axum middleware logging request start and end.
pub async fn log_requests(mut req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let query = req.uri().query().unwrap_or("").to_string();
    let remote = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.to_string())
        .unwrap_or_default();
    let user_agent = header_str(&req, header::USER_AGENT);
    let auth = match req.headers().get(header::AUTHORIZATION) {
        Some(v) if v.as_bytes().starts_with(b"Bearer ") => "Bearer ***",
        Some(_) => "present",
        None => "",
    };
    let is_sse = header_str(&req, header::ACCEPT).contains("text/event-stream")
        || path.contains("/sse")
        || header_str(&req, header::CACHE_CONTROL) == "no-cache";

    tracing::info!(
        method, path, query, remote, ua = %user_agent, auth,
        "http_request_start"
    );

    // Debug mode only: attach small JSON bodies to the record. Bodies
    // without a known small length are never buffered.
    if tracing::enabled!(tracing::Level::DEBUG) && method == "POST" {
        if let Some(len) = content_length(&req) {
            if len > 0 && len < BODY_LOG_LIMIT {
                req = log_body(req).await;
            } else if len >= BODY_LOG_LIMIT {
                tracing::debug!(request_body = %format!("<too large: {len} bytes>"), "request body");
            }
        }
    }

    if is_sse {
        tracing::info!(path, "SSE connection initiated");
    }

    let response = next.run(req).await;
    let duration = start.elapsed();
    let status = response.status().as_u16();
    let bytes = response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);

    if is_sse {
        tracing::info!(path, status, duration = ?duration, "SSE connection closed");
    } else {
        tracing::info!(
            method, path, query, remote, status, bytes,
            duration = ?duration,
            "http_request_end"
        );
    }
    response
}

fn header_str(req: &Request<Body>, name: header::HeaderName) -> String {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

fn content_length(req: &Request<Body>) -> Option<u64> {
    req.headers()
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

/// Buffer a small body, log it, and rebuild the request.
async fn log_body(req: Request<Body>) -> Request<Body> {
    let (parts, body) = req.into_parts();
    match axum::body::to_bytes(body, BODY_LOG_LIMIT as usize).await {
        Ok(bytes) => {
            match serde_json::from_slice::<serde_json::Value>(&bytes) {
                Ok(json) => tracing::debug!(request_body = %json, "request body"),
                Err(_) => {
                    let text = String::from_utf8_lossy(&bytes);
                    let preview: String = text.chars().take(200).collect();
                    tracing::debug!(request_body = %preview, "request body");
                }
            }
            Request::from_parts(parts, Body::from(bytes))
        }
        Err(_) => Request::from_parts(parts, Body::empty()),
    }
}
