//! Session store port.
//!
//! The state machine never talks to a concrete database. Phase application
//! and rollback go through this injected port so the surrounding application
//! decides where sessions actually live.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, SessionId};
use crate::domain::phase::ConversationPhase;
use crate::domain::session::{Session, SessionContext};

/// Partial update applied to a stored session.
///
/// Only the present fields change; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub phase: Option<ConversationPhase>,
    pub context: Option<SessionContext>,
}

impl SessionUpdate {
    /// Update that only moves the phase.
    pub fn phase(phase: ConversationPhase) -> Self {
        Self {
            phase: Some(phase),
            ..Default::default()
        }
    }

    /// Update that restores both phase and context (rollback).
    pub fn restore(phase: ConversationPhase, context: SessionContext) -> Self {
        Self {
            phase: Some(phase),
            context: Some(context),
        }
    }
}

/// Port for fetching and updating sessions.
///
/// Implementations must apply updates atomically: a phase+context update is
/// visible either fully or not at all.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetches a session by id. Returns `None` if it does not exist.
    async fn get_session(&self, id: SessionId) -> Result<Option<Session>, DomainError>;

    /// Applies a partial update to an existing session.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` if the session does not exist
    /// - `StorageError` on persistence failure
    async fn update_session(&self, id: SessionId, update: SessionUpdate)
        -> Result<(), DomainError>;
}
