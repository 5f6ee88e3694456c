//! Session snapshots and the session-note store capability.
//!
//! The broker keeps its per-session SAML state (federated NameID, session
//! index) in string notes attached to the host's sessions. The engine
//! only needs note get/set keyed by session id, so that is the whole
//! interface.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// An in-flight authentication, before a user session exists.
///
/// Carries the client notes set by the application that started the
/// login (e.g. the login hint).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticationSession {
    /// Session identifier. Notes written during this authentication are
    /// stored under this id and become the user session's notes once
    /// authentication completes.
    pub id: Uuid,

    /// Client-provided notes for this authentication.
    pub client_notes: HashMap<String, String>,
}

impl AuthenticationSession {
    /// Creates an empty authentication session.
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            client_notes: HashMap::new(),
        }
    }

    /// Gets a client note.
    #[must_use]
    pub fn client_note(&self, key: &str) -> Option<&str> {
        self.client_notes.get(key).map(String::as_str)
    }

    /// Sets a client note.
    pub fn set_client_note(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.client_notes.insert(key.into(), value.into());
    }
}

/// Client note keys used by the SAML broker.
pub mod client_notes {
    /// Login hint forwarded from the application that initiated login.
    pub const LOGIN_HINT: &str = "login_hint";
}

/// An established user session.
///
/// The session id doubles as the relay state of backchannel logout
/// requests, so the inbound logout-response handler can locate the
/// session being terminated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSession {
    /// Session identifier.
    pub id: Uuid,

    /// When the session was established.
    pub started: DateTime<Utc>,
}

impl UserSession {
    /// Creates a user session snapshot starting now.
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            started: Utc::now(),
        }
    }
}

/// Error type for note store operations.
#[derive(Debug, Error)]
pub enum SessionNotesError {
    /// Session not found or expired.
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),

    /// Backing store failure.
    #[error("note store error: {0}")]
    Storage(String),
}

/// Per-session string key/value notes.
///
/// Implementations may use in-memory storage, distributed cache, or
/// database storage depending on deployment requirements. Notes written
/// against an authentication session must be visible under the resulting
/// user session's id once authentication completes; that transfer is the
/// host's responsibility.
#[async_trait]
pub trait SessionNotes: Send + Sync {
    /// Gets a note for a session.
    async fn get_note(
        &self,
        session_id: Uuid,
        key: &str,
    ) -> Result<Option<String>, SessionNotesError>;

    /// Sets a note for a session.
    async fn set_note(
        &self,
        session_id: Uuid,
        key: &str,
        value: &str,
    ) -> Result<(), SessionNotesError>;
}

/// In-memory note store.
///
/// Suitable for single-node deployments and tests.
#[derive(Debug, Default)]
pub struct MemorySessionNotes {
    notes: Mutex<HashMap<(Uuid, String), String>>,
}

impl MemorySessionNotes {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionNotes for MemorySessionNotes {
    async fn get_note(
        &self,
        session_id: Uuid,
        key: &str,
    ) -> Result<Option<String>, SessionNotesError> {
        let notes = self.notes.lock().expect("note store lock poisoned");
        Ok(notes.get(&(session_id, key.to_string())).cloned())
    }

    async fn set_note(
        &self,
        session_id: Uuid,
        key: &str,
        value: &str,
    ) -> Result<(), SessionNotesError> {
        let mut notes = self.notes.lock().expect("note store lock poisoned");
        notes.insert((session_id, key.to_string()), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_notes() {
        let mut session = AuthenticationSession::new(Uuid::new_v4());
        session.set_client_note(client_notes::LOGIN_HINT, "alice@example.com");
        assert_eq!(
            session.client_note(client_notes::LOGIN_HINT),
            Some("alice@example.com")
        );
        assert_eq!(session.client_note("missing"), None);
    }

    #[tokio::test]
    async fn memory_notes_roundtrip() {
        let store = MemorySessionNotes::new();
        let id = Uuid::new_v4();

        assert_eq!(store.get_note(id, "k").await.unwrap(), None);
        store.set_note(id, "k", "v").await.unwrap();
        assert_eq!(store.get_note(id, "k").await.unwrap(), Some("v".to_string()));

        // Notes are scoped per session.
        assert_eq!(store.get_note(Uuid::new_v4(), "k").await.unwrap(), None);
    }
}
