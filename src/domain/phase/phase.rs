//! Conversation phases of the OKR authoring flow.
//!
//! Unlike ad-hoc dialogue states, phases form a fixed total order. Progress
//! is forward-only through `attempt_transition`; moving backward is possible
//! only via explicit rollback to a snapshot.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::StateMachine;

/// The current phase of the OKR authoring conversation.
///
/// Phases flow strictly forward:
/// `Discovery` → `Refinement` → `KrDiscovery` → `Validation` → `Completed`
///
/// `Completed` is terminal and accepts no outbound transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConversationPhase {
    /// Drafting a first objective statement with the user.
    #[default]
    Discovery,

    /// Raising the objective's quality to the bar set for key-result work.
    Refinement,

    /// Collecting measurable key results for the objective.
    KrDiscovery,

    /// Final human review of the complete OKR set.
    Validation,

    /// OKR set finished; read-only.
    Completed,
}

impl ConversationPhase {
    /// All phases in their fixed order.
    pub fn ordered() -> [Self; 5] {
        [
            Self::Discovery,
            Self::Refinement,
            Self::KrDiscovery,
            Self::Validation,
            Self::Completed,
        ]
    }

    /// Position in the fixed total order.
    pub fn index(&self) -> usize {
        match self {
            Self::Discovery => 0,
            Self::Refinement => 1,
            Self::KrDiscovery => 2,
            Self::Validation => 3,
            Self::Completed => 4,
        }
    }

    /// The next phase in order. `Completed` maps to itself.
    pub fn next(&self) -> Self {
        match self {
            Self::Discovery => Self::Refinement,
            Self::Refinement => Self::KrDiscovery,
            Self::KrDiscovery => Self::Validation,
            Self::Validation => Self::Completed,
            Self::Completed => Self::Completed,
        }
    }

    /// Returns a short label suitable for UI display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Discovery => "Discovery",
            Self::Refinement => "Refinement",
            Self::KrDiscovery => "Key Result Discovery",
            Self::Validation => "Validation",
            Self::Completed => "Completed",
        }
    }
}

impl StateMachine for ConversationPhase {
    /// Only the immediate successor is reachable; skipping phases is not.
    fn can_transition_to(&self, target: &Self) -> bool {
        *self != Self::Completed && *target == self.next()
    }

    fn valid_transitions(&self) -> Vec<Self> {
        Self::ordered()
            .iter()
            .copied()
            .filter(|p| self.can_transition_to(p))
            .collect()
    }
}
