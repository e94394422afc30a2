//! Point-in-time session recovery from snapshots.
//!
//! Restoration goes through the injected session store so this component
//! never knows where sessions actually live. Every rollback re-verifies the
//! target session still exists and matches the snapshot before applying;
//! rolling back a deleted or rotated session fails loudly rather than
//! silently doing nothing.

use std::sync::Arc;
use thiserror::Error;

use crate::domain::foundation::{DomainError, SessionId, SnapshotId};
use crate::domain::phase::ConversationPhase;
use crate::ports::{SessionStore, SessionUpdate};

use super::{SnapshotManager, StateSnapshot};

/// Why a rollback could not be performed.
#[derive(Debug, Error)]
pub enum RollbackError {
    #[error("No snapshots exist for session {0}")]
    NoSnapshot(SessionId),

    #[error("Snapshot {0} not found")]
    SnapshotNotFound(SnapshotId),

    #[error("No snapshot for phase {0:?}")]
    NoSnapshotForPhase(ConversationPhase),

    #[error("Session {0} no longer exists")]
    SessionNotFound(SessionId),

    #[error("Snapshot belongs to session {expected}, not {actual}")]
    SessionMismatch {
        expected: SessionId,
        actual: SessionId,
    },

    #[error("Session store error: {0}")]
    Store(#[from] DomainError),
}

/// Outcome of a successful rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackResult {
    pub session_id: SessionId,
    pub snapshot_id: SnapshotId,
    pub restored_phase: ConversationPhase,
}

/// Restores sessions to prior snapshots.
pub struct RollbackManager {
    snapshots: Arc<SnapshotManager>,
    store: Arc<dyn SessionStore>,
}

impl RollbackManager {
    pub fn new(snapshots: Arc<SnapshotManager>, store: Arc<dyn SessionStore>) -> Self {
        Self { snapshots, store }
    }

    /// Restores the most recent snapshot.
    pub async fn rollback_to_previous(
        &self,
        session_id: SessionId,
    ) -> Result<RollbackResult, RollbackError> {
        let snapshot = self
            .snapshots
            .previous_snapshot(session_id)
            .ok_or(RollbackError::NoSnapshot(session_id))?;
        self.apply(session_id, snapshot).await
    }

    /// Restores a specific snapshot by id.
    pub async fn rollback_to_snapshot(
        &self,
        session_id: SessionId,
        snapshot_id: SnapshotId,
    ) -> Result<RollbackResult, RollbackError> {
        let snapshot = self
            .snapshots
            .snapshot_by_id(session_id, snapshot_id)
            .ok_or(RollbackError::SnapshotNotFound(snapshot_id))?;
        self.apply(session_id, snapshot).await
    }

    /// Restores the most recent snapshot taken in the given phase, scanning
    /// newest to oldest.
    pub async fn rollback_to_phase(
        &self,
        session_id: SessionId,
        phase: ConversationPhase,
    ) -> Result<RollbackResult, RollbackError> {
        let snapshot = self
            .snapshots
            .latest_snapshot_for_phase(session_id, phase)
            .ok_or(RollbackError::NoSnapshotForPhase(phase))?;
        self.apply(session_id, snapshot).await
    }

    /// Verifies the target session then applies phase and context as one
    /// atomic update. Either both are restored or neither is.
    async fn apply(
        &self,
        session_id: SessionId,
        snapshot: StateSnapshot,
    ) -> Result<RollbackResult, RollbackError> {
        let session = self
            .store
            .get_session(session_id)
            .await?
            .ok_or(RollbackError::SessionNotFound(session_id))?;

        if session.id != snapshot.session_id {
            return Err(RollbackError::SessionMismatch {
                expected: snapshot.session_id,
                actual: session.id,
            });
        }

        self.store
            .update_session(
                session_id,
                SessionUpdate::restore(snapshot.phase, snapshot.context.clone()),
            )
            .await?;

        tracing::info!(
            session_id = %session_id,
            snapshot_id = %snapshot.id,
            restored_phase = ?snapshot.phase,
            "session rolled back"
        );

        Ok(RollbackResult {
            session_id,
            snapshot_id: snapshot.id,
            restored_phase: snapshot.phase,
        })
    }
}
