//! Google federated login.
//!
//! The authorize endpoint redirects here when federation is enabled. The
//! login leg stashes the client's authorization request under a random
//! state and sends the user to Google; the callback exchanges the provider
//! code, fetches the profile, enforces the domain allow-list, creates a
//! user session, and synthesizes the housekeeper authorization code.

use crate::authority::Authority;
use crate::routes::{found, issue_code_redirect, redirect_uri_matches, AuthorizeParams};
use crate::store::{FederationState, UserSession};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    #[serde(default)]
    email: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    picture: String,
}

/// The callback URL registered with Google: the configured base, or the
/// request host.
fn callback_url(authority: &Authority, headers: &HeaderMap) -> String {
    let base = authority.config().google.redirect_base_url.trim();
    let base = if base.is_empty() {
        authority.issuer(headers)
    } else {
        base.trim_end_matches('/').to_string()
    };
    format!("{base}/oauth/callback/google")
}

/// `GET /oauth/login/google`: validate the carried client request, stash it
/// under a fresh federation state, and redirect to Google.
pub async fn login(
    State(authority): State<Arc<Authority>>,
    headers: HeaderMap,
    Query(params): Query<AuthorizeParams>,
) -> Response {
    let google = &authority.config().google;
    if google.client_id.is_empty() || google.client_secret.is_empty() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Google OAuth not configured",
        )
            .into_response();
    }

    // The client and redirect URI were validated at /oauth/authorize, but
    // this endpoint is public; re-validate so it cannot be driven directly.
    {
        let clients = authority.stores.clients.read().await;
        let Some(client) = clients.get(&params.client_id) else {
            return (StatusCode::UNAUTHORIZED, "invalid client_id").into_response();
        };
        let valid = url::Url::parse(&params.redirect_uri)
            .map(|supplied| {
                client
                    .redirect_uris
                    .iter()
                    .any(|registered| redirect_uri_matches(registered, &supplied))
            })
            .unwrap_or(false);
        if !valid {
            return (StatusCode::BAD_REQUEST, "invalid redirect_uri").into_response();
        }
    }

    let state = Authority::random_string(43);
    let record = FederationState {
        state: state.clone(),
        client_id: params.client_id.clone(),
        redirect_uri: params.redirect_uri.clone(),
        scope: params.scope.clone(),
        original_state: params.state.clone(),
        code_challenge: params.code_challenge.clone(),
        challenge_method: params.code_challenge_method.clone(),
        created_at: Utc::now(),
    };
    authority
        .stores
        .federation_states
        .write()
        .await
        .insert(state.clone(), record);
    authority.stores.gc_federation_states(Utc::now()).await;

    let auth_url = format!(
        "{GOOGLE_AUTH_URL}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&access_type=offline",
        urlencoding::encode(&google.client_id),
        urlencoding::encode(&callback_url(&authority, &headers)),
        urlencoding::encode("openid email profile"),
        urlencoding::encode(&state),
    );
    found(&auth_url)
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    error: String,
}

/// `GET /oauth/callback/google`: exchange the provider code, enforce the
/// domain allow-list, create the user session, and hand an authorization
/// code back to the original client.
pub async fn callback(
    State(authority): State<Arc<Authority>>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Response {
    if !params.error.is_empty() {
        tracing::error!(error = %params.error, "Google OAuth error");
        return (
            StatusCode::BAD_REQUEST,
            format!("Google OAuth error: {}", params.error),
        )
            .into_response();
    }

    let Some(flow) = authority.stores.take_federation_state(&params.state).await else {
        return (StatusCode::BAD_REQUEST, "Invalid OAuth state").into_response();
    };

    let user = match exchange_and_fetch_profile(&authority, &headers, &params.code).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    let Some((_, domain)) = user.email.split_once('@') else {
        return (StatusCode::BAD_REQUEST, "Invalid email format").into_response();
    };
    let allowed = &authority.config().google.allowed_domains;
    if !allowed.is_empty() && !allowed.iter().any(|d| d == domain) {
        tracing::warn!(email = %user.email, domain, "user domain not allowed");
        return (
            StatusCode::FORBIDDEN,
            format!("Email domain '{domain}' is not allowed"),
        )
            .into_response();
    }

    let session_id = Authority::random_string(32);
    let session = UserSession {
        session_id: session_id.clone(),
        email: user.email.clone(),
        name: user.name.clone(),
        picture: user.picture.clone(),
        domain: domain.to_string(),
        created_at: Utc::now(),
        expires_at: Utc::now() + Duration::hours(24),
        client_id: flow.client_id.clone(),
    };
    authority
        .stores
        .user_sessions
        .write()
        .await
        .insert(session_id, session);
    authority.stores.gc_user_sessions(Utc::now()).await;

    tracing::info!(
        email = %user.email,
        domain,
        client_id = %flow.client_id,
        "Google OAuth login successful"
    );

    let synthesized = AuthorizeParams {
        response_type: "code".to_string(),
        client_id: flow.client_id,
        redirect_uri: flow.redirect_uri,
        scope: flow.scope,
        state: flow.original_state,
        code_challenge: flow.code_challenge,
        code_challenge_method: flow.challenge_method,
    };
    issue_code_redirect(&authority, &synthesized, &user.email).await
}

async fn exchange_and_fetch_profile(
    authority: &Authority,
    headers: &HeaderMap,
    code: &str,
) -> Result<GoogleUserInfo, Response> {
    let google = &authority.config().google;
    let http = reqwest::Client::new();
    let redirect_uri = callback_url(authority, headers);

    let token: GoogleTokenResponse = http
        .post(GOOGLE_TOKEN_URL)
        .form(&[
            ("code", code),
            ("client_id", google.client_id.as_str()),
            ("client_secret", google.client_secret.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await
        .map_err(exchange_failure)?
        .error_for_status()
        .map_err(exchange_failure)?
        .json()
        .await
        .map_err(exchange_failure)?;

    http.get(GOOGLE_USERINFO_URL)
        .bearer_auth(&token.access_token)
        .send()
        .await
        .map_err(profile_failure)?
        .error_for_status()
        .map_err(profile_failure)?
        .json()
        .await
        .map_err(profile_failure)
}

fn exchange_failure(e: reqwest::Error) -> Response {
    tracing::error!(error = %e, "failed to exchange Google OAuth code");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Failed to exchange OAuth code",
    )
        .into_response()
}

fn profile_failure(e: reqwest::Error) -> Response {
    tracing::error!(error = %e, "failed to get Google user info");
    (StatusCode::INTERNAL_SERVER_ERROR, "Failed to get user info").into_response()
}
