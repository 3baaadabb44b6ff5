//! Server-side OAuth credential storage keyed by opaque session ids

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

/// OAuth token material for the mail provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub refresh_token: Option<String>,
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    pub scopes: Vec<String>,
}

/// Opaque session identifier handed to the browser instead of credentials
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Rebuild from a cookie value
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub trait CredentialStore: Send + Sync {
    /// Store credentials under a fresh session id
    fn put(&self, credentials: Credentials) -> SessionId;

    fn get(&self, session: &SessionId) -> Option<Credentials>;

    /// Forget a session (logout); unknown ids are ignored
    fn remove(&self, session: &SessionId);
}

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    sessions: RwLock<HashMap<SessionId, Credentials>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().map_or(0, |s| s.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn put(&self, credentials: Credentials) -> SessionId {
        let session = SessionId::generate();
        match self.sessions.write() {
            Ok(mut sessions) => {
                sessions.insert(session.clone(), credentials);
                debug!("Stored credentials for session {session}");
            }
            Err(_) => warn!("Credential lock poisoned, session {session} not stored"),
        }
        session
    }

    fn get(&self, session: &SessionId) -> Option<Credentials> {
        self.sessions.read().ok()?.get(session).cloned()
    }

    fn remove(&self, session: &SessionId) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.remove(session);
        }
    }
}
