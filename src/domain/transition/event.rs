//! Transition audit events.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{SessionId, Timestamp};
use crate::domain::phase::{ConversationPhase, TransitionTrigger};
use crate::domain::session::QualityScores;

/// The kind of transition event being emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionEventType {
    /// A transition has been proposed and is about to be validated.
    Before,

    /// A transition was applied successfully.
    After,

    /// A transition was rejected by validation or failed during execution.
    Failed,
}

impl TransitionEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
            Self::Failed => "failed",
        }
    }
}

/// Immutable audit record of one transition attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub session_id: SessionId,
    pub occurred_at: Timestamp,
    pub from: ConversationPhase,
    pub to: ConversationPhase,
    pub trigger: TransitionTrigger,
    pub quality: QualityScores,
    pub message_count: usize,
    pub turns_in_phase: u32,
    pub success: bool,
    pub errors: Vec<String>,
}

impl TransitionEvent {
    /// Builds an event for a successful or proposed transition.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session_id: SessionId,
        from: ConversationPhase,
        to: ConversationPhase,
        trigger: TransitionTrigger,
        quality: QualityScores,
        message_count: usize,
        turns_in_phase: u32,
    ) -> Self {
        Self {
            session_id,
            occurred_at: Timestamp::now(),
            from,
            to,
            trigger,
            quality,
            message_count,
            turns_in_phase,
            success: true,
            errors: Vec::new(),
        }
    }

    /// Marks the event as failed with the given reasons.
    pub fn failed(mut self, errors: Vec<String>) -> Self {
        self.success = false;
        self.errors = errors;
        self
    }

    /// Age relative to `now`, in seconds.
    pub fn age_secs(&self, now: Timestamp) -> u64 {
        now.duration_since(&self.occurred_at)
            .num_seconds()
            .max(0) as u64
    }
}
