//! The authority object: signing key, stores, and token issuance.
//!
//! Constructed once at startup and passed into handlers as shared state;
//! there is no module-level mutable state.

use crate::error::OauthError;
use crate::keys::SigningKey;
use crate::store::{Stores, TokenRecord};
use axum::http::HeaderMap;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use housekeeper_core::config::OauthConfig;
use jsonwebtoken::{Algorithm, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Access-token lifetime.
pub const ACCESS_TOKEN_TTL_SECS: i64 = 3600;

/// Authorization-code lifetime.
pub const AUTH_CODE_TTL_MINS: i64 = 10;

/// Claims carried by every issued access token.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    pub scope: String,
    pub client_id: String,
    pub azp: String,
}

/// The embedded authorization server.
#[derive(Debug)]
pub struct Authority {
    cfg: OauthConfig,
    key: SigningKey,
    pub stores: Stores,
}

impl Authority {
    /// Build the authority, generating the per-process signing key. Key
    /// generation failure is fatal at startup.
    pub fn new(cfg: OauthConfig) -> Result<Self, OauthError> {
        let key = SigningKey::generate()?;
        tracing::info!(kid = %key.kid(), "OAuth initialized with in-memory RSA key");
        Ok(Self {
            cfg,
            key,
            stores: Stores::default(),
        })
    }

    pub fn config(&self) -> &OauthConfig {
        &self.cfg
    }

    pub fn key(&self) -> &SigningKey {
        &self.key
    }

    /// The issuer for a request: the configured value, or derived from the
    /// request's Host header. Deployments terminating TLS elsewhere set
    /// `oauth.issuer` explicitly.
    pub fn issuer(&self, headers: &HeaderMap) -> String {
        let configured = self.cfg.issuer.trim();
        if !configured.is_empty() {
            return configured.to_string();
        }
        let host = headers
            .get(axum::http::header::HOST)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("localhost:3333");
        format!("http://{host}")
    }

    /// A url-safe random string of `len` characters.
    pub fn random_string(len: usize) -> String {
        let mut bytes = vec![0u8; len];
        rand::thread_rng().fill_bytes(&mut bytes);
        let mut s = URL_SAFE_NO_PAD.encode(&bytes);
        s.truncate(len);
        s
    }

    /// Issue a signed access token audienced for `audience` and record the
    /// access/refresh pair in the stores. Returns `(access, refresh)`.
    pub async fn issue_tokens(
        &self,
        issuer: &str,
        client_id: &str,
        subject: &str,
        scope: &str,
        audience: &str,
    ) -> Result<(String, String), OauthError> {
        let access = self.sign_access_token(issuer, client_id, subject, scope, audience)?;
        let refresh = Self::random_string(48);
        let record = TokenRecord {
            access_token: access.clone(),
            refresh_token: refresh.clone(),
            client_id: client_id.to_string(),
            subject: subject.to_string(),
            scope: scope.to_string(),
            expires_at: Utc::now() + Duration::seconds(ACCESS_TOKEN_TTL_SECS),
            created_at: Utc::now(),
        };
        self.stores
            .access_tokens
            .write()
            .await
            .insert(access.clone(), record.clone());
        self.stores
            .refresh_tokens
            .write()
            .await
            .insert(refresh.clone(), record);
        Ok((access, refresh))
    }

    /// Sign a fresh access token without touching the stores. Used by the
    /// refresh grant, which keeps the existing refresh token.
    pub fn sign_access_token(
        &self,
        issuer: &str,
        client_id: &str,
        subject: &str,
        scope: &str,
        audience: &str,
    ) -> Result<String, OauthError> {
        let now = Utc::now();
        let claims = AccessClaims {
            iss: issuer.to_string(),
            sub: subject.to_string(),
            aud: audience.to_string(),
            exp: (now + Duration::seconds(ACCESS_TOKEN_TTL_SECS)).timestamp(),
            iat: now.timestamp(),
            scope: scope.to_string(),
            client_id: client_id.to_string(),
            azp: client_id.to_string(),
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.key.kid().to_string());
        jsonwebtoken::encode(&header, &claims, self.key.encoding())
            .map_err(|e| OauthError::KeyGeneration(e.to_string()))
    }

    /// Verify a bearer token: RS256 only, the live `kid`, a valid
    /// signature, and an audience of either the server origin or the
    /// literal `mcp`.
    pub fn verify_bearer(&self, token: &str, issuer: &str) -> Result<AccessClaims, OauthError> {
        let header = jsonwebtoken::decode_header(token)
            .map_err(|e| OauthError::InvalidRequest(e.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(OauthError::InvalidRequest(format!(
                "unexpected signing method: {:?}",
                header.alg
            )));
        }
        if header.kid.as_deref() != Some(self.key.kid()) {
            return Err(OauthError::InvalidRequest("invalid key ID".to_string()));
        }

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[issuer, "mcp"]);
        let data = jsonwebtoken::decode::<AccessClaims>(token, self.key.decoding(), &validation)
            .map_err(|e| OauthError::InvalidRequest(e.to_string()))?;
        Ok(data.claims)
    }
}
