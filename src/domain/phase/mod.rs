//! Phase domain - definitions, readiness scoring, and transition validation.

mod config;
mod phase;
mod readiness;
mod signals;
mod trigger;
mod validator;

pub use config::{config_for, PhaseConfig, PHASE_CONFIGS};
pub use phase::ConversationPhase;
pub use readiness::{PhaseReadiness, ReadinessEvaluator};
pub use signals::{detect_finalization_signal, SignalDetection, SignalPolicy, SignalStrength};
pub use trigger::TransitionTrigger;
pub use validator::{TransitionValidator, ValidationOutcome};
