//! Bearer auth gate for the MCP transport.
//!
//! Applied to the HTTP surface when `oauth.required` is true. Discovery and
//! auth endpoints stay public; everything else needs a bearer token that
//! verifies under the live signing key with an audience of the server
//! origin or the literal `mcp`. Rejections carry the RFC-style challenge
//! header pointing at the authorization-server metadata.

use crate::authority::Authority;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, Request, StatusCode, Uri};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

/// Paths reachable without a token.
const PUBLIC_PATHS: &[&str] = &[
    "/.well-known/oauth-protected-resource",
    "/.well-known/oauth-authorization-server",
    "/.well-known/openid-configuration",
    "/oauth/jwks",
    "/oauth/register",
    "/oauth/authorize",
    "/oauth/token",
    "/oauth/login/google",
    "/oauth/callback/google",
    "/healthz",
];

/// Whether `path` is on the public allow-list.
pub fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path)
}

/// Axum middleware enforcing bearer authentication.
pub async fn require_auth(
    State(authority): State<Arc<Authority>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if is_public_path(req.uri().path()) {
        return next.run(req).await;
    }

    let issuer = authority.issuer(req.headers());

    let Some(auth_header) = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    else {
        tracing::debug!(
            path = %req.uri().path(),
            method = %req.method(),
            "request without auth token - sending OAuth challenge"
        );
        return unauthorized_response(&issuer, req.method(), req.uri(), req.headers());
    };

    let token = match auth_header.split_once(' ') {
        Some(("Bearer", token)) => token.trim(),
        _ => return unauthorized_response(&issuer, req.method(), req.uri(), req.headers()),
    };

    match authority.verify_bearer(token, &issuer) {
        Ok(claims) => {
            tracing::debug!(subject = %claims.sub, client_id = %claims.client_id, "bearer token admitted");
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!(error = %e, "invalid token");
            unauthorized_response(&issuer, req.method(), req.uri(), req.headers())
        }
    }
}

/// Whether the request looks like an SSE stream open. The path fragment and
/// Cache-Control forms catch clients that open the stream without an Accept
/// header.
fn is_sse_request(uri: &Uri, headers: &HeaderMap) -> bool {
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");
    let cache_control = headers
        .get(header::CACHE_CONTROL)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");
    accept.contains("text/event-stream")
        || uri.path().contains("/sse")
        || cache_control == "no-cache"
}

/// Build the 401 challenge. SSE-shaped requests get a short plain-text
/// OAuth hint; HEAD gets headers only; everything else a bare body.
pub fn unauthorized_response(
    issuer: &str,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
) -> Response {
    let www_authenticate = format!(
        "Bearer realm=\"{issuer}\", as_uri=\"{issuer}/.well-known/oauth-authorization-server\", resource=\"{issuer}\""
    );

    if method == Method::HEAD {
        return (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, www_authenticate)],
        )
            .into_response();
    }

    if is_sse_request(uri, headers) {
        let body = format!(
            "Authentication required. OAuth server: {issuer}/.well-known/oauth-authorization-server"
        );
        return (
            StatusCode::UNAUTHORIZED,
            [
                (header::WWW_AUTHENTICATE, www_authenticate),
                (
                    header::CONTENT_TYPE,
                    "text/plain; charset=utf-8".to_string(),
                ),
                (header::CACHE_CONTROL, "no-cache".to_string()),
            ],
            body,
        )
            .into_response();
    }

    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, www_authenticate)],
        "Unauthorized",
    )
        .into_response()
}
