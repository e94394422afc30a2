//! Immutable point-in-time captures of session state.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{SessionId, SnapshotId, Timestamp};
use crate::domain::phase::ConversationPhase;
use crate::domain::session::{QualityScores, SessionContext};

/// Why a snapshot was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotReason {
    /// Taken automatically before applying a transition.
    BeforeTransition,

    /// Requested explicitly by the caller.
    Manual,

    /// Periodic safety checkpoint.
    Checkpoint,
}

/// An immutable capture of a session's phase, context, and quality scores.
///
/// Snapshots own deep copies of everything they store. Mutating the live
/// session after a snapshot is taken never alters the snapshot; restoring a
/// snapshot hands back clones, never shared references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub id: SnapshotId,
    pub session_id: SessionId,
    pub created_at: Timestamp,
    pub phase: ConversationPhase,
    pub context: SessionContext,
    pub quality: QualityScores,
    pub message_count: usize,
    pub reason: SnapshotReason,
}

impl StateSnapshot {
    /// Captures the given state, cloning context and quality scores.
    pub fn capture(
        session_id: SessionId,
        phase: ConversationPhase,
        context: &SessionContext,
        quality: &QualityScores,
        message_count: usize,
        reason: SnapshotReason,
    ) -> Self {
        Self {
            id: SnapshotId::new(),
            session_id,
            created_at: Timestamp::now(),
            phase,
            context: context.clone(),
            quality: quality.clone(),
            message_count,
            reason,
        }
    }

    /// Age relative to `now`, in seconds. Zero for snapshots from the future
    /// (clock skew).
    pub fn age_secs(&self, now: Timestamp) -> u64 {
        now.duration_since(&self.created_at)
            .num_seconds()
            .max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_deep_copies_the_context() {
        let mut context = SessionContext::default();
        context.okr_data.objective = Some("Original objective".to_string());

        let snapshot = StateSnapshot::capture(
            SessionId::new(),
            ConversationPhase::Discovery,
            &context,
            &QualityScores::empty(),
            3,
            SnapshotReason::Manual,
        );

        // Mutate the live context after capture
        context.okr_data.objective = Some("Changed".to_string());
        context.okr_data.key_results.push("New KR".to_string());

        assert_eq!(
            snapshot.context.okr_data.objective.as_deref(),
            Some("Original objective")
        );
        assert!(snapshot.context.okr_data.key_results.is_empty());
    }

    #[test]
    fn age_is_measured_from_creation() {
        let snapshot = StateSnapshot::capture(
            SessionId::new(),
            ConversationPhase::Discovery,
            &SessionContext::default(),
            &QualityScores::empty(),
            0,
            SnapshotReason::Checkpoint,
        );

        let later = snapshot.created_at.plus_secs(120);
        assert_eq!(snapshot.age_secs(later), 120);

        let earlier = snapshot.created_at.minus_secs(60);
        assert_eq!(snapshot.age_secs(earlier), 0);
    }

    #[test]
    fn reason_serializes_to_snake_case() {
        let json = serde_json::to_string(&SnapshotReason::BeforeTransition).unwrap();
        assert_eq!(json, "\"before_transition\"");
    }
}
