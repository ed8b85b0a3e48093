//! SSE session bookkeeping.
//!
//! A session is a correlation scope only: it pairs the long-lived event
//! stream opened by a GET with the POST endpoint subsequent requests go to.
//! It holds no per-user state (that lives in the access token).

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// Serialized JSON-RPC frames bound for one session's event stream.
pub type SessionSender = mpsc::Sender<String>;

/// Active SSE sessions keyed by session id.
#[derive(Debug, Default, Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionSender>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session: a fresh id plus the receiving half of its outbound
    /// channel. The bounded channel propagates back-pressure from slow
    /// consumers instead of buffering without limit.
    pub async fn open(&self) -> (String, mpsc::Receiver<String>) {
        let id = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::channel(32);
        self.sessions.write().await.insert(id.clone(), tx);
        (id, rx)
    }

    /// Sender for a session, if it is still connected.
    pub async fn sender(&self, id: &str) -> Option<SessionSender> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Drop a session.
    pub async fn close(&self, id: &str) {
        self.sessions.write().await.remove(id);
    }

    /// Number of open sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
