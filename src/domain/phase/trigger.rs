//! Transition triggers - the tagged reason a transition is proposed.

use serde::{Deserialize, Serialize};

/// Why a phase transition was attempted. Exactly one trigger is attached to
/// every transition attempt and carried into the audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransitionTrigger {
    /// The readiness score cleared the phase's quality threshold.
    QualityMet { score: f64, threshold: f64 },

    /// The user explicitly approved moving on.
    UserApproval { signal: String, confidence: f64 },

    /// The phase exceeded its turn budget; progress is forced.
    Timeout { turns_in_phase: u32, limit: u32 },

    /// An operator or calling system forced the transition.
    Forced { reason: String },

    /// The validator rejected the proposed transition.
    ValidationFailed { errors: Vec<String> },
}

impl TransitionTrigger {
    /// Stable label used as a statistics key.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::QualityMet { .. } => "quality_met",
            Self::UserApproval { .. } => "user_approval",
            Self::Timeout { .. } => "timeout",
            Self::Forced { .. } => "forced",
            Self::ValidationFailed { .. } => "validation_failed",
        }
    }
}

impl std::fmt::Display for TransitionTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QualityMet { score, threshold } => {
                write!(f, "quality met ({:.2} >= {:.2})", score, threshold)
            }
            Self::UserApproval { signal, confidence } => {
                write!(f, "user approval (\"{}\", confidence {:.2})", signal, confidence)
            }
            Self::Timeout { turns_in_phase, limit } => {
                write!(f, "timeout ({} turns, limit {})", turns_in_phase, limit)
            }
            Self::Forced { reason } => write!(f, "forced ({})", reason),
            Self::ValidationFailed { errors } => {
                write!(f, "validation failed ({} errors)", errors.len())
            }
        }
    }
}
