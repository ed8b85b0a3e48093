//! In-memory stores for the OAuth flow.
//!
//! All state is process-local and lost on restart. Each map is a concurrent
//! store under last-writer-wins; authorization codes and federation states
//! have consumption semantics (delete on first read).

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// A dynamically registered OAuth client.
#[derive(Debug, Clone, Serialize)]
pub struct RegisteredClient {
    pub client_id: String,
    /// Absent for public clients (`token_endpoint_auth_method = none`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    pub redirect_uris: Vec<String>,
    pub client_name: String,
    pub created_at: DateTime<Utc>,
}

/// A one-time authorization code and the request it is bound to.
#[derive(Debug, Clone)]
pub struct AuthorizationCode {
    pub code: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,
    pub state: String,
    pub code_challenge: String,
    pub challenge_method: String,
    pub expires_at: DateTime<Utc>,
    pub subject: String,
}

/// Binding behind an issued access/refresh token pair.
#[derive(Debug, Clone)]
pub struct TokenRecord {
    pub access_token: String,
    pub refresh_token: String,
    pub client_id: String,
    pub subject: String,
    pub scope: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// An in-flight federated authorization request.
#[derive(Debug, Clone)]
pub struct FederationState {
    pub state: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,
    /// The state supplied by the client application.
    pub original_state: String,
    pub code_challenge: String,
    pub challenge_method: String,
    pub created_at: DateTime<Utc>,
}

/// A user session created by a completed federated login.
#[derive(Debug, Clone)]
pub struct UserSession {
    pub session_id: String,
    pub email: String,
    pub name: String,
    pub picture: String,
    pub domain: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub client_id: String,
}

/// The authority's concurrent state.
#[derive(Debug, Default)]
pub struct Stores {
    pub clients: RwLock<HashMap<String, RegisteredClient>>,
    pub codes: RwLock<HashMap<String, AuthorizationCode>>,
    pub access_tokens: RwLock<HashMap<String, TokenRecord>>,
    pub refresh_tokens: RwLock<HashMap<String, TokenRecord>>,
    pub federation_states: RwLock<HashMap<String, FederationState>>,
    pub user_sessions: RwLock<HashMap<String, UserSession>>,
}

impl Stores {
    /// Consume an authorization code: removed on first read so a second
    /// redemption cannot succeed.
    pub async fn take_code(&self, code: &str) -> Option<AuthorizationCode> {
        self.codes.write().await.remove(code)
    }

    /// Consume a federation state (one use per callback).
    pub async fn take_federation_state(&self, state: &str) -> Option<FederationState> {
        self.federation_states.write().await.remove(state)
    }

    /// Drop federation states older than ten minutes. Called
    /// opportunistically when new states are created.
    pub async fn gc_federation_states(&self, now: DateTime<Utc>) {
        self.federation_states
            .write()
            .await
            .retain(|_, s| now - s.created_at < Duration::minutes(10));
    }

    /// Drop user sessions past their expiry.
    pub async fn gc_user_sessions(&self, now: DateTime<Utc>) {
        self.user_sessions
            .write()
            .await
            .retain(|_, s| s.expires_at > now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(name: &str) -> AuthorizationCode {
        AuthorizationCode {
            code: name.to_string(),
            client_id: "c".to_string(),
            redirect_uri: "https://client/cb".to_string(),
            scope: String::new(),
            state: String::new(),
            code_challenge: String::new(),
            challenge_method: String::new(),
            expires_at: Utc::now() + Duration::minutes(10),
            subject: "mcp-user".to_string(),
        }
    }

    #[tokio::test]
    async fn test_code_consumed_on_first_read() {
        let stores = Stores::default();
        stores
            .codes
            .write()
            .await
            .insert("abc".to_string(), code("abc"));

        assert!(stores.take_code("abc").await.is_some());
        assert!(stores.take_code("abc").await.is_none());
    }

    #[tokio::test]
    async fn test_federation_state_gc() {
        let stores = Stores::default();
        let now = Utc::now();
        let mut old = FederationState {
            state: "old".to_string(),
            client_id: "c".to_string(),
            redirect_uri: String::new(),
            scope: String::new(),
            original_state: String::new(),
            code_challenge: String::new(),
            challenge_method: String::new(),
            created_at: now - Duration::minutes(11),
        };
        stores
            .federation_states
            .write()
            .await
            .insert("old".to_string(), old.clone());
        old.state = "fresh".to_string();
        old.created_at = now;
        stores
            .federation_states
            .write()
            .await
            .insert("fresh".to_string(), old);

        stores.gc_federation_states(now).await;
        assert!(stores.take_federation_state("old").await.is_none());
        assert!(stores.take_federation_state("fresh").await.is_some());
    }
}
