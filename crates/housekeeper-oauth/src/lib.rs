//! # housekeeper-oauth
//!
//! Embedded OAuth 2.1 authorization server and bearer auth gate for the
//! Housekeeper MCP gateway.
//!
//! The authority serves discovery metadata, a JWKS, dynamic client
//! registration, the authorization and token endpoints (authorization-code
//! with PKCE, refresh-token), and an optional Google federation leg. All
//! state lives in process memory: a fresh RSA key pair is generated at
//! startup, authorization codes expire after ten minutes and burn on first
//! use, access tokens are RS256 JWTs with a one-hour lifetime and a
//! resource-indicator audience.
//!
//! The gate admits requests to the MCP transport only when they carry a
//! bearer token that verifies under the live signing key and is audienced
//! for this server (or the literal `mcp`).

mod authority;
mod error;
mod gate;
mod google;
mod keys;
mod pkce;
mod routes;
mod store;

pub mod cors;

pub use authority::Authority;
pub use error::OauthError;
pub use gate::{is_public_path, require_auth, unauthorized_response};
pub use keys::SigningKey;
pub use pkce::verify_pkce;
pub use routes::router;
pub use store::{AuthorizationCode, FederationState, RegisteredClient, TokenRecord, UserSession};
