//! End-to-end authorization-code flow against the authority router.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use housekeeper_core::config::OauthConfig;
use housekeeper_oauth::{router, Authority};
use http_body_util::BodyExt;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tower::ServiceExt;

fn test_authority() -> Arc<Authority> {
    Arc::new(
        Authority::new(OauthConfig {
            enabled: true,
            required: true,
            issuer: "https://server".to_string(),
            google: Default::default(),
        })
        .unwrap(),
    )
}

fn app(authority: Arc<Authority>) -> Router {
    router(authority)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn register_client(app: &Router, public: bool) -> Value {
    let mut body = serde_json::json!({
        "redirect_uris": ["https://client/cb"],
        "client_name": "test client",
    });
    if public {
        body["token_endpoint_auth_method"] = serde_json::json!("none");
    }
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/oauth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

/// Split the `code` query parameter out of a redirect Location.
fn extract_query_param(location: &str, name: &str) -> Option<String> {
    let url = url::Url::parse(location).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

fn decode_jwt_parts(token: &str) -> (Value, Value) {
    let mut parts = token.split('.');
    let header: Value =
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts.next().unwrap()).unwrap()).unwrap();
    let claims: Value =
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts.next().unwrap()).unwrap()).unwrap();
    (header, claims)
}

#[tokio::test]
async fn test_full_pkce_flow_and_code_single_use() {
    // Register, authorize with PKCE, redeem, and confirm the code burns.
    let authority = test_authority();
    let app = app(authority.clone());

    let registration = register_client(&app, true).await;
    let client_id = registration["client_id"].as_str().unwrap();
    assert!(registration.get("client_secret").is_none());
    assert!(client_id.len() >= 32);

    let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
    let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));

    // Authorize: auto-approve, 302 back to the client with code and state.
    let authorize_uri = format!(
        "/oauth/authorize?response_type=code&client_id={client_id}&redirect_uri=https%3A%2F%2Fclient%2Fcb&code_challenge={challenge}&code_challenge_method=S256&state=abc"
    );
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(&authorize_uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(location.starts_with("https://client/cb"));
    assert_eq!(extract_query_param(&location, "state").as_deref(), Some("abc"));
    let code = extract_query_param(&location, "code").unwrap();

    // Redeem the code with the PKCE verifier and a resource indicator.
    let token_body = format!(
        "grant_type=authorization_code&code={code}&code_verifier={verifier}&redirect_uri=https%3A%2F%2Fclient%2Fcb&client_id={client_id}&resource=https%3A%2F%2Fserver%2F"
    );
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/oauth/token")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(token_body.clone()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let token_response = body_json(response).await;
    assert_eq!(token_response["token_type"], "Bearer");
    assert_eq!(token_response["expires_in"], 3600);
    assert!(token_response["refresh_token"].as_str().is_some());

    let access = token_response["access_token"].as_str().unwrap();
    let (jwt_header, claims) = decode_jwt_parts(access);
    assert_eq!(jwt_header["alg"], "RS256");
    assert_eq!(claims["iss"], "https://server");
    assert_eq!(claims["aud"], "https://server/");
    assert_eq!(claims["sub"], "mcp-user");
    assert_eq!(claims["azp"], client_id);
    assert_eq!(
        claims["exp"].as_i64().unwrap() - claims["iat"].as_i64().unwrap(),
        3600
    );

    // Second redemption of the same code must fail with invalid_grant.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/oauth/token")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(token_body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let err = body_json(response).await;
    assert_eq!(err["error"], "invalid_grant");
}

#[tokio::test]
async fn test_pkce_wrong_verifier_rejected() {
    let authority = test_authority();
    let app = app(authority.clone());
    let registration = register_client(&app, true).await;
    let client_id = registration["client_id"].as_str().unwrap();

    let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(b"right-verifier-right-verifier-right-verifier"));
    let authorize_uri = format!(
        "/oauth/authorize?response_type=code&client_id={client_id}&redirect_uri=https%3A%2F%2Fclient%2Fcb&code_challenge={challenge}&code_challenge_method=S256"
    );
    let response = app
        .clone()
        .oneshot(Request::builder().uri(&authorize_uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
    let code = extract_query_param(&location, "code").unwrap();

    let token_body = format!(
        "grant_type=authorization_code&code={code}&code_verifier=wrong-verifier-wrong-verifier-wrong-verifier&redirect_uri=https%3A%2F%2Fclient%2Fcb&client_id={client_id}"
    );
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/oauth/token")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(token_body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let err = body_json(response).await;
    assert_eq!(err["error"], "invalid_grant");
}

#[tokio::test]
async fn test_redirect_uri_mismatch_rejected() {
    let authority = test_authority();
    let app = app(authority.clone());
    let registration = register_client(&app, true).await;
    let client_id = registration["client_id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!(
                    "/oauth/authorize?response_type=code&client_id={client_id}&redirect_uri=https%3A%2F%2Fevil%2Fcb"
                ))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_confidential_client_secret_flow() {
    let authority = test_authority();
    let app = app(authority.clone());

    let registration = register_client(&app, false).await;
    let client_id = registration["client_id"].as_str().unwrap();
    let client_secret = registration["client_secret"].as_str().unwrap();
    assert_eq!(registration["client_secret_expires_at"], 0);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!(
                    "/oauth/authorize?response_type=code&client_id={client_id}&redirect_uri=https%3A%2F%2Fclient%2Fcb"
                ))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
    let code = extract_query_param(&location, "code").unwrap();

    // No PKCE verifier: the client secret authenticates the exchange.
    let token_body = format!(
        "grant_type=authorization_code&code={code}&redirect_uri=https%3A%2F%2Fclient%2Fcb&client_id={client_id}&client_secret={client_secret}"
    );
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/oauth/token")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(token_body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let token_response = body_json(response).await;

    // Refresh: new access token, same subject and scope, audience from the
    // current resource parameter.
    let refresh = token_response["refresh_token"].as_str().unwrap();
    let refresh_body = format!(
        "grant_type=refresh_token&refresh_token={refresh}&client_id={client_id}&client_secret={client_secret}&resource=mcp"
    );
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/oauth/token")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(refresh_body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let refreshed = body_json(response).await;
    let (_, claims) = decode_jwt_parts(refreshed["access_token"].as_str().unwrap());
    assert_eq!(claims["sub"], "mcp-user");
    assert_eq!(claims["aud"], "mcp");
}

#[tokio::test]
async fn test_refresh_with_wrong_secret_rejected() {
    let authority = test_authority();
    let app = app(authority.clone());
    let registration = register_client(&app, false).await;
    let client_id = registration["client_id"].as_str().unwrap();
    let client_secret = registration["client_secret"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!(
                    "/oauth/authorize?response_type=code&client_id={client_id}&redirect_uri=https%3A%2F%2Fclient%2Fcb"
                ))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
    let code = extract_query_param(&location, "code").unwrap();

    let token_body = format!(
        "grant_type=authorization_code&code={code}&redirect_uri=https%3A%2F%2Fclient%2Fcb&client_id={client_id}&client_secret={client_secret}"
    );
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/oauth/token")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(token_body))
                .unwrap(),
        )
        .await
        .unwrap();
    let token_response = body_json(response).await;
    let refresh = token_response["refresh_token"].as_str().unwrap();

    let refresh_body = format!(
        "grant_type=refresh_token&refresh_token={refresh}&client_id={client_id}&client_secret=not-the-secret"
    );
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/oauth/token")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(refresh_body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_discovery_and_jwks() {
    let authority = test_authority();
    let app = app(authority.clone());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/.well-known/oauth-authorization-server")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let meta = body_json(response).await;
    assert_eq!(meta["issuer"], "https://server");
    assert_eq!(meta["registration_endpoint"], "https://server/oauth/register");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/oauth/jwks")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let jwks = body_json(response).await;
    let key = &jwks["keys"][0];
    assert_eq!(key["kty"], "RSA");
    assert_eq!(key["alg"], "RS256");
    assert_eq!(key["use"], "sig");
    assert_eq!(key["kid"].as_str().unwrap().len(), 16);
}

#[tokio::test]
async fn test_registration_requires_redirect_uris() {
    let authority = test_authority();
    let app = app(authority.clone());
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/oauth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"client_name": "no uris"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_preflight_short_circuits() {
    let authority = test_authority();
    let app = app(authority.clone());
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/oauth/token")
                .header(header::ORIGIN, "https://claude.ai")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "https://claude.ai"
    );
}
