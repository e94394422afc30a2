//! Transition validation - invariant checks independent of readiness.
//!
//! The validator re-checks a proposed transition against the session data it
//! will actually commit with. A readiness pass does not guarantee the
//! invariants hold (the data may have changed since evaluation), so this is
//! deliberate defense in depth. Pure function: no side effects, no mutation.

use crate::domain::session::{sanitize_score, QualityScores, SessionContext};

use super::{config_for, ConversationPhase};

/// Result of validating a proposed transition.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    pub valid: bool,

    /// Human-readable reasons the transition is rejected. Non-empty whenever
    /// `valid` is false.
    pub errors: Vec<String>,
}

impl ValidationOutcome {
    fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    fn rejected(errors: Vec<String>) -> Self {
        debug_assert!(!errors.is_empty());
        Self {
            valid: false,
            errors,
        }
    }
}

/// Validates proposed phase transitions against ordering and
/// data-availability invariants.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransitionValidator;

impl TransitionValidator {
    pub fn new() -> Self {
        Self
    }

    /// Checks whether `from -> to` is permitted given the session's current
    /// data and quality scores.
    pub fn validate(
        &self,
        from: ConversationPhase,
        to: ConversationPhase,
        context: &SessionContext,
        quality: &QualityScores,
    ) -> ValidationOutcome {
        let mut errors = Vec::new();

        // Rule 1: ordering. Terminal first, then backward/self, then skips.
        if from == ConversationPhase::Completed {
            errors.push("Session is completed; no further transitions are allowed".to_string());
        } else if to.index() <= from.index() {
            errors.push(format!(
                "Cannot move from {} to {}: phases only advance forward",
                from.label(),
                to.label()
            ));
        } else if to != from.next() {
            errors.push(format!(
                "Cannot skip from {} to {}: the next phase is {}",
                from.label(),
                to.label(),
                from.next().label()
            ));
        }

        // Rule 2: data required to enter the target phase.
        let config = config_for(to);
        for path in config.required_data {
            if !context.has_data(path) {
                errors.push(format!(
                    "Missing required data for {}: {}",
                    to.label(),
                    path
                ));
            }
        }

        // Entering the terminal phase also requires the overall quality bar.
        if to == ConversationPhase::Completed {
            match resolve_overall(quality) {
                Some(score) if score >= config.min_data_quality => {}
                Some(score) => errors.push(format!(
                    "Overall quality {:.0} is below the {:.0} required to complete",
                    score, config.min_data_quality
                )),
                None => errors.push(
                    "No quality scores available; cannot verify completion quality".to_string(),
                ),
            }
        }

        if errors.is_empty() {
            ValidationOutcome::ok()
        } else {
            ValidationOutcome::rejected(errors)
        }
    }
}

/// Same cascade the validation phase uses: objective overall, composite
/// overall, then mean key-result score.
fn resolve_overall(quality: &QualityScores) -> Option<f64> {
    quality
        .objective
        .as_ref()
        .map(|o| o.overall)
        .or_else(|| quality.overall.as_ref().map(|o| o.score))
        .or_else(|| quality.mean_key_result_score())
        .map(|raw| sanitize_score(raw).0)
}
