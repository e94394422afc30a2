//! In-memory session store for testing.
//!
//! Provides deterministic storage for unit and integration tests, plus a
//! reference implementation of the `SessionStore` atomicity contract.
//! Production deployments supply their own database-backed adapter.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, SessionId};
use crate::domain::session::Session;
use crate::ports::{SessionStore, SessionUpdate};

/// In-memory session store keyed by session id.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl InMemorySessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a session under its own id.
    pub async fn insert(&self, session: Session) {
        self.sessions.write().await.insert(session.id, session);
    }

    /// Inserts a session under an arbitrary key (for mismatch tests).
    pub async fn insert_at(&self, key: SessionId, session: Session) {
        self.sessions.write().await.insert(key, session);
    }

    /// Removes a session, returning whether it existed.
    pub async fn remove(&self, id: SessionId) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    /// Number of stored sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_session(&self, id: SessionId) -> Result<Option<Session>, DomainError> {
        Ok(self.sessions.read().await.get(&id).cloned())
    }

    async fn update_session(
        &self,
        id: SessionId,
        update: SessionUpdate,
    ) -> Result<(), DomainError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| DomainError::session_not_found(id))?;

        if let Some(context) = update.context {
            session.context = context;
        }
        if let Some(phase) = update.phase {
            session.set_phase(phase);
        }
        Ok(())
    }
}
