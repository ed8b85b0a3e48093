//! HTTP routes of the embedded authorization server.
//!
//! Everything here is public (no bearer token required): discovery, JWKS,
//! registration, authorize, token, and the federation leg. When OAuth is
//! disabled the router is simply not mounted, so these paths 404.

use crate::authority::{Authority, AUTH_CODE_TTL_MINS};
use crate::cors::cors;
use crate::google;
use crate::pkce::verify_pkce;
use crate::store::{AuthorizationCode, RegisteredClient};
use axum::extract::{Form, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Build the authority router. Mounted by the HTTP transport when
/// `oauth.enabled` is true.
pub fn router(authority: Arc<Authority>) -> Router {
    let mut r = Router::new()
        .route("/.well-known/openid-configuration", get(well_known_oidc))
        .route(
            "/.well-known/oauth-authorization-server",
            get(well_known_oauth),
        )
        .route(
            "/.well-known/oauth-protected-resource",
            get(well_known_protected_resource),
        )
        .route("/oauth/jwks", get(jwks))
        .route("/oauth/register", post(register))
        .route("/oauth/authorize", get(authorize))
        .route("/oauth/token", post(token));

    if authority.config().google.enabled {
        r = r
            .route("/oauth/login/google", get(google::login))
            .route("/oauth/callback/google", get(google::callback));
    }

    r.layer(axum::middleware::from_fn(cors))
        .with_state(authority)
}

/// An OAuth-style JSON error response.
fn oauth_error(status: StatusCode, error: &str, description: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "error": error,
            "error_description": description.into(),
        })),
    )
        .into_response()
}

fn invalid_grant(description: impl Into<String>) -> Response {
    oauth_error(StatusCode::BAD_REQUEST, "invalid_grant", description)
}

fn invalid_client(description: impl Into<String>) -> Response {
    oauth_error(StatusCode::UNAUTHORIZED, "invalid_client", description)
}

/// A 302 redirect. OAuth user-agent redirects use Found, not See Other.
pub(crate) fn found(location: &str) -> Response {
    (
        StatusCode::FOUND,
        [(header::LOCATION, location.to_string())],
    )
        .into_response()
}

// -----------------------------
// Discovery
// -----------------------------

fn server_metadata(iss: &str, with_registration: bool) -> Value {
    let mut meta = json!({
        "issuer": iss,
        "authorization_endpoint": format!("{iss}/oauth/authorize"),
        "token_endpoint": format!("{iss}/oauth/token"),
        "jwks_uri": format!("{iss}/oauth/jwks"),
        "response_types_supported": ["code"],
        "grant_types_supported": ["authorization_code", "refresh_token"],
        "scopes_supported": ["openid", "profile", "email", "mcp"],
        "token_endpoint_auth_methods_supported": ["client_secret_basic", "client_secret_post", "none"],
        "code_challenge_methods_supported": ["S256", "plain"],
    });
    if with_registration {
        meta["registration_endpoint"] = json!(format!("{iss}/oauth/register"));
    }
    meta
}

async fn well_known_oidc(
    State(authority): State<Arc<Authority>>,
    headers: HeaderMap,
) -> Json<Value> {
    let iss = authority.issuer(&headers);
    tracing::debug!(path = "/.well-known/openid-configuration", "OAuth discovery request");
    Json(server_metadata(&iss, false))
}

async fn well_known_oauth(
    State(authority): State<Arc<Authority>>,
    headers: HeaderMap,
) -> Json<Value> {
    let iss = authority.issuer(&headers);
    tracing::debug!(
        path = "/.well-known/oauth-authorization-server",
        "OAuth discovery request"
    );
    Json(server_metadata(&iss, true))
}

async fn well_known_protected_resource(
    State(authority): State<Arc<Authority>>,
    headers: HeaderMap,
) -> Json<Value> {
    let iss = authority.issuer(&headers);
    Json(json!({
        "resource": iss,
        "oauth_metadata_uri": format!("{iss}/.well-known/oauth-authorization-server"),
        "bearer_methods_supported": ["header"],
        "response_types_supported": ["code"],
        "grant_types_supported": ["authorization_code", "refresh_token"],
        "scopes_supported": ["openid", "profile", "email", "mcp"],
        "token_endpoint_auth_methods_supported": ["client_secret_basic", "none"],
        "code_challenge_methods_supported": ["S256", "plain"],
    }))
}

async fn jwks(State(authority): State<Arc<Authority>>) -> Json<Value> {
    Json(json!({ "keys": [authority.key().jwk()] }))
}

// -----------------------------
// Dynamic client registration
// -----------------------------

#[derive(Debug, Deserialize)]
struct RegistrationRequest {
    #[serde(default)]
    redirect_uris: Vec<String>,
    #[serde(default)]
    client_name: String,
    #[serde(default)]
    token_endpoint_auth_method: Option<String>,
}

async fn register(
    State(authority): State<Arc<Authority>>,
    Json(req): Json<RegistrationRequest>,
) -> Response {
    if req.redirect_uris.is_empty() {
        return oauth_error(
            StatusCode::BAD_REQUEST,
            "invalid_client_metadata",
            "redirect_uris required",
        );
    }

    // Public clients (`none`) get no secret; everything else does.
    let public = req.token_endpoint_auth_method.as_deref() == Some("none");
    let client_id = Authority::random_string(32);
    let client_secret = (!public).then(|| Authority::random_string(48));

    let client = RegisteredClient {
        client_id: client_id.clone(),
        client_secret: client_secret.clone(),
        redirect_uris: req.redirect_uris.clone(),
        client_name: req.client_name.clone(),
        created_at: Utc::now(),
    };
    authority
        .stores
        .clients
        .write()
        .await
        .insert(client_id.clone(), client.clone());

    tracing::info!(client_id = %client_id, name = %req.client_name, "OAuth client registered");

    let mut body = json!({
        "client_id": client_id,
        "redirect_uris": req.redirect_uris,
        "client_name": req.client_name,
        "token_endpoint_auth_method": if public { "none" } else { "client_secret_basic" },
        "created_at": client.created_at.timestamp(),
    });
    if let Some(secret) = client_secret {
        body["client_secret"] = json!(secret);
        // Never-expires sentinel.
        body["client_secret_expires_at"] = json!(0);
    }
    (StatusCode::CREATED, Json(body)).into_response()
}

// -----------------------------
// Authorization endpoint
// -----------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct AuthorizeParams {
    #[serde(default)]
    pub response_type: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub redirect_uri: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub code_challenge: String,
    #[serde(default)]
    pub code_challenge_method: String,
}

/// Exact redirect URI comparison: scheme and host case-insensitively, path
/// and raw query byte-for-byte.
pub(crate) fn redirect_uri_matches(registered: &str, supplied: &url::Url) -> bool {
    let Ok(registered) = url::Url::parse(registered) else {
        return false;
    };
    registered.scheme().eq_ignore_ascii_case(supplied.scheme())
        && host_port(&registered).eq_ignore_ascii_case(&host_port(supplied))
        && registered.path() == supplied.path()
        && registered.query().unwrap_or("") == supplied.query().unwrap_or("")
}

fn host_port(u: &url::Url) -> String {
    match (u.host_str(), u.port()) {
        (Some(h), Some(p)) => format!("{h}:{p}"),
        (Some(h), None) => h.to_string(),
        _ => String::new(),
    }
}

pub(crate) async fn validate_authorize_request(
    authority: &Authority,
    params: &AuthorizeParams,
) -> Result<(), Response> {
    if params.response_type != "code" {
        return Err(oauth_error(
            StatusCode::BAD_REQUEST,
            "unsupported_response_type",
            "unsupported response_type",
        ));
    }

    let clients = authority.stores.clients.read().await;
    let Some(client) = clients.get(&params.client_id) else {
        return Err(invalid_client("invalid client_id"));
    };

    let Ok(supplied) = url::Url::parse(&params.redirect_uri) else {
        return Err(oauth_error(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            "invalid redirect_uri",
        ));
    };
    let matched = client
        .redirect_uris
        .iter()
        .any(|registered| redirect_uri_matches(registered, &supplied));
    if !matched {
        return Err(oauth_error(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            "invalid redirect_uri",
        ));
    }
    Ok(())
}

/// Bind a fresh authorization code to the request and build the client
/// redirect carrying `code` and the original `state`.
pub(crate) async fn issue_code_redirect(
    authority: &Authority,
    params: &AuthorizeParams,
    subject: &str,
) -> Response {
    let code = Authority::random_string(32);
    let auth_code = AuthorizationCode {
        code: code.clone(),
        client_id: params.client_id.clone(),
        redirect_uri: params.redirect_uri.clone(),
        scope: params.scope.clone(),
        state: params.state.clone(),
        code_challenge: params.code_challenge.clone(),
        challenge_method: params.code_challenge_method.clone(),
        expires_at: Utc::now() + Duration::minutes(AUTH_CODE_TTL_MINS),
        subject: subject.to_string(),
    };
    authority
        .stores
        .codes
        .write()
        .await
        .insert(code.clone(), auth_code);

    let Ok(mut target) = url::Url::parse(&params.redirect_uri) else {
        return oauth_error(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            "invalid redirect_uri",
        );
    };
    target.query_pairs_mut().append_pair("code", &code);
    if !params.state.is_empty() {
        target.query_pairs_mut().append_pair("state", &params.state);
    }

    tracing::info!(client_id = %params.client_id, "authorization code issued");
    found(target.as_str())
}

async fn authorize(
    State(authority): State<Arc<Authority>>,
    Query(params): Query<AuthorizeParams>,
) -> Response {
    tracing::info!(
        client_id = %params.client_id,
        redirect_uri = %params.redirect_uri,
        response_type = %params.response_type,
        scope = %params.scope,
        state_present = !params.state.is_empty(),
        "OAuth authorization request"
    );

    if let Err(response) = validate_authorize_request(&authority, &params).await {
        return response;
    }

    // With federation enabled the login leg resolves the subject; otherwise
    // auto-approve with the static MCP subject (no consent screen).
    if authority.config().google.enabled {
        let login_url = format!(
            "/oauth/login/google?client_id={}&redirect_uri={}&scope={}&state={}&code_challenge={}&code_challenge_method={}",
            urlencoding::encode(&params.client_id),
            urlencoding::encode(&params.redirect_uri),
            urlencoding::encode(&params.scope),
            urlencoding::encode(&params.state),
            urlencoding::encode(&params.code_challenge),
            urlencoding::encode(&params.code_challenge_method),
        );
        return found(&login_url);
    }

    issue_code_redirect(&authority, &params, "mcp-user").await
}

// -----------------------------
// Token endpoint
// -----------------------------

async fn token(
    State(authority): State<Arc<Authority>>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let grant_type = form.get("grant_type").map(String::as_str).unwrap_or("");
    tracing::info!(
        grant_type,
        client_id = form.get("client_id").map(String::as_str).unwrap_or(""),
        resource = form.get("resource").map(String::as_str).unwrap_or(""),
        "OAuth token request"
    );

    match grant_type {
        "authorization_code" => authorization_code_grant(&authority, &headers, &form).await,
        "refresh_token" => refresh_token_grant(&authority, &headers, &form).await,
        other => oauth_error(
            StatusCode::BAD_REQUEST,
            "unsupported_grant_type",
            format!("unsupported grant_type: {other}"),
        ),
    }
}

/// Client credentials from the form, or from HTTP Basic when absent.
fn client_credentials(headers: &HeaderMap, form: &HashMap<String, String>) -> (String, String) {
    let mut client_id = form.get("client_id").cloned().unwrap_or_default();
    let mut client_secret = form.get("client_secret").cloned().unwrap_or_default();
    if client_id.is_empty() || client_secret.is_empty() {
        if let Some((user, pass)) = basic_auth(headers) {
            client_id = user;
            client_secret = pass;
        }
    }
    (client_id, client_secret)
}

fn basic_auth(headers: &HeaderMap) -> Option<(String, String)> {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;

    let value = headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

/// Audience: the client-supplied resource indicator, or the server origin.
fn audience_for(form: &HashMap<String, String>, issuer: &str) -> String {
    match form.get("resource") {
        Some(r) if !r.trim().is_empty() => r.trim().to_string(),
        _ => issuer.to_string(),
    }
}

async fn authorization_code_grant(
    authority: &Authority,
    headers: &HeaderMap,
    form: &HashMap<String, String>,
) -> Response {
    let code = form.get("code").map(String::as_str).unwrap_or("");
    let redirect_uri = form.get("redirect_uri").map(String::as_str).unwrap_or("");
    let code_verifier = form.get("code_verifier").map(String::as_str).unwrap_or("");
    let (client_id, client_secret) = client_credentials(headers, form);

    // One-time use: the code burns on first redemption, success or not.
    let Some(auth_code) = authority.stores.take_code(code).await else {
        return invalid_grant("invalid authorization code");
    };

    if Utc::now() > auth_code.expires_at {
        return invalid_grant("authorization code expired");
    }
    if auth_code.client_id != client_id {
        return invalid_client("client_id mismatch");
    }

    if code_verifier.is_empty() {
        // Confidential path: the registered secret must match.
        let clients = authority.stores.clients.read().await;
        let Some(client) = clients.get(&client_id) else {
            return invalid_client("invalid client");
        };
        if client.client_secret.as_deref() != Some(client_secret.as_str()) {
            return invalid_client("invalid client_secret");
        }
    } else if !verify_pkce(
        &auth_code.code_challenge,
        &auth_code.challenge_method,
        code_verifier,
    ) {
        return invalid_grant("invalid code_verifier");
    }

    if auth_code.redirect_uri != redirect_uri {
        return invalid_grant("redirect_uri mismatch");
    }

    let issuer = authority.issuer(headers);
    let audience = audience_for(form, &issuer);
    let (access, refresh) = match authority
        .issue_tokens(
            &issuer,
            &client_id,
            &auth_code.subject,
            &auth_code.scope,
            &audience,
        )
        .await
    {
        Ok(pair) => pair,
        Err(e) => {
            return oauth_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
                e.to_string(),
            )
        }
    };

    tracing::info!(client_id = %client_id, subject = %auth_code.subject, "access token issued");
    Json(json!({
        "access_token": access,
        "token_type": "Bearer",
        "expires_in": 3600,
        "refresh_token": refresh,
        "scope": auth_code.scope,
    }))
    .into_response()
}

async fn refresh_token_grant(
    authority: &Authority,
    headers: &HeaderMap,
    form: &HashMap<String, String>,
) -> Response {
    let refresh_token = form.get("refresh_token").map(String::as_str).unwrap_or("");
    let (client_id, client_secret) = client_credentials(headers, form);

    let record = {
        let tokens = authority.stores.refresh_tokens.read().await;
        tokens.get(refresh_token).cloned()
    };
    let Some(mut record) = record else {
        return invalid_grant("invalid refresh_token");
    };

    if record.client_id != client_id {
        return invalid_client("client_id mismatch");
    }
    {
        let clients = authority.stores.clients.read().await;
        let Some(client) = clients.get(&client_id) else {
            return invalid_client("invalid client");
        };
        if let Some(secret) = &client.client_secret {
            if *secret != client_secret {
                return invalid_client("invalid client_secret");
            }
        }
    }

    let issuer = authority.issuer(headers);
    let audience = audience_for(form, &issuer);
    let access = match authority.sign_access_token(
        &issuer,
        &client_id,
        &record.subject,
        &record.scope,
        &audience,
    ) {
        Ok(token) => token,
        Err(e) => {
            return oauth_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
                e.to_string(),
            )
        }
    };

    // The refresh token stays valid; the stored binding tracks the newest
    // access token.
    record.access_token = access.clone();
    record.expires_at = Utc::now() + Duration::seconds(crate::authority::ACCESS_TOKEN_TTL_SECS);
    authority
        .stores
        .access_tokens
        .write()
        .await
        .insert(access.clone(), record.clone());
    authority
        .stores
        .refresh_tokens
        .write()
        .await
        .insert(refresh_token.to_string(), record.clone());

    Json(json!({
        "access_token": access,
        "token_type": "Bearer",
        "expires_in": 3600,
        "scope": record.scope,
    }))
    .into_response()
}
