//! Error types for the OAuth authority.

use thiserror::Error;

/// Errors raised by the authority. The routes module maps each variant to
/// its wire form; `InvalidGrant` always becomes a 400 with
/// `error=invalid_grant`.
#[derive(Debug, Error)]
pub enum OauthError {
    /// Signing-key generation failed. Fatal at startup.
    #[error("failed to generate signing key: {0}")]
    KeyGeneration(String),

    /// A request was structurally invalid (missing fields, bad URI).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The client is unknown or failed authentication.
    #[error("invalid client: {0}")]
    InvalidClient(String),

    /// Code reuse, PKCE mismatch, expired code, or redirect mismatch.
    #[error("invalid grant: {0}")]
    InvalidGrant(String),

    /// The federated identity provider rejected or failed the exchange.
    #[error("federation error: {0}")]
    Federation(String),

    /// The authenticated identity is not admitted by policy.
    #[error("forbidden: {0}")]
    Forbidden(String),
}
