//! Per-phase readiness evaluation.
//!
//! Readiness answers one question every turn: may this session advance to
//! the next phase, and if not, what exactly is missing? Each phase weighs the
//! evidence differently because "ready" means something different per stage:
//! discovery rewards having any usable draft, refinement is a pure quality
//! gate, key-result discovery demands a minimum count, and validation is the
//! human sign-off step.
//!
//! Evaluation is pure. Identical inputs always produce identical output, and
//! malformed quality scores are coerced to zero with an explanatory missing
//! element instead of an error.

use super::{config_for, detect_finalization_signal, ConversationPhase, SignalDetection,
    SignalPolicy};
use crate::domain::session::{sanitize_score, QualityScores, Session};

/// Minimum character count for an objective draft to count in discovery.
const DISCOVERY_DRAFT_MIN_CHARS: usize = 10;

/// Result of evaluating a session's readiness to leave its current phase.
///
/// Ephemeral: recomputed every turn, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseReadiness {
    pub phase: ConversationPhase,

    /// 0-1 readiness score for the current phase.
    pub readiness_score: f64,

    /// Human-readable descriptions of what still blocks the transition.
    /// Always non-empty when a transition is blocked for cause.
    pub missing_elements: Vec<String>,

    pub ready_to_transition: bool,

    /// The phase a transition would enter, when ready.
    pub next_phase: Option<ConversationPhase>,

    /// Suggested conversational moves for the coaching layer.
    pub recommended_actions: Vec<String>,

    /// True when the user signaled they want to finalize.
    pub finalization_signal: bool,

    /// Full detection detail, for trigger construction and audit.
    pub signal: SignalDetection,
}

/// Evaluates per-phase readiness from quality scores, turn counts, and
/// recent message text.
#[derive(Debug, Clone)]
pub struct ReadinessEvaluator {
    policy: SignalPolicy,
}

impl ReadinessEvaluator {
    pub fn new(policy: SignalPolicy) -> Self {
        Self { policy }
    }

    /// Computes readiness for the session's current phase.
    pub fn evaluate(&self, session: &Session, quality: &QualityScores) -> PhaseReadiness {
        let recent = session.recent_messages(self.policy.scan_depth);
        let signal = detect_finalization_signal(&self.policy, &recent, session.total_turns());

        let mut readiness = match session.phase {
            ConversationPhase::Discovery => evaluate_discovery(session, quality, &signal),
            ConversationPhase::Refinement => evaluate_refinement(session, quality),
            ConversationPhase::KrDiscovery => evaluate_kr_discovery(session, quality),
            ConversationPhase::Validation => evaluate_validation(session, quality),
            ConversationPhase::Completed => completed_readiness(&signal),
        };

        readiness.finalization_signal = signal.detected;
        readiness.signal = signal;
        readiness.recommended_actions =
            recommended_actions(session.phase, &readiness.missing_elements, readiness.ready_to_transition);
        readiness
    }
}

impl Default for ReadinessEvaluator {
    fn default() -> Self {
        Self::new(SignalPolicy::default())
    }
}

/// Discovery: up to 50 points for having a non-trivial draft, up to 50 from
/// the objective's overall quality score. A finalization signal can shortcut
/// the quality bar, but only when some objective data exists.
fn evaluate_discovery(
    session: &Session,
    quality: &QualityScores,
    signal: &SignalDetection,
) -> PhaseReadiness {
    let config = config_for(ConversationPhase::Discovery);
    let mut missing = Vec::new();
    let mut malformed = false;

    let objective = session
        .context
        .okr_data
        .objective
        .as_deref()
        .unwrap_or("")
        .trim();
    let has_draft = objective.chars().count() > DISCOVERY_DRAFT_MIN_CHARS;

    let draft_points = if has_draft {
        50.0
    } else {
        missing.push("Clear objective statement".to_string());
        0.0
    };

    let quality_points = match &quality.objective {
        Some(objective_score) => {
            let (overall, nan) = sanitize_score(objective_score.overall);
            malformed |= nan;

            let (outcome, nan) = sanitize_score(objective_score.dimensions.outcome_oriented);
            malformed |= nan;
            if outcome < 60.0 {
                missing.push("Outcome-oriented phrasing".to_string());
            }

            let (clarity, nan) = sanitize_score(objective_score.dimensions.clarity);
            malformed |= nan;
            if clarity < 60.0 {
                missing.push("Unambiguous wording".to_string());
            }

            let (inspirational, nan) = sanitize_score(objective_score.dimensions.inspirational);
            malformed |= nan;
            if inspirational < 50.0 {
                missing.push("Inspirational framing".to_string());
            }

            overall / 100.0 * 50.0
        }
        None => {
            missing.push("Quality assessment of the objective".to_string());
            0.0
        }
    };

    if malformed {
        missing.push("Valid quality scores (scorer returned malformed values)".to_string());
    }

    let combined = draft_points + quality_points;
    let threshold = config.quality_threshold * 100.0;
    let signal_override = signal.detected && !objective.is_empty();
    let ready = (combined >= threshold || signal_override)
        && session.turns_in_phase >= config.min_turns;

    if !ready && missing.is_empty() {
        if session.turns_in_phase < config.min_turns {
            missing.push(more_turns_needed(session.turns_in_phase, config.min_turns));
        } else {
            missing.push(quality_gap(combined, threshold));
        }
    }

    build(ConversationPhase::Discovery, combined / 100.0, missing, ready)
}

/// Refinement: the score is the objective's overall quality, nothing else.
/// Ready only at >= 0.75 with zero missing elements. A finalization signal
/// never overrides the floors here; refinement exists to raise quality.
fn evaluate_refinement(session: &Session, quality: &QualityScores) -> PhaseReadiness {
    let config = config_for(ConversationPhase::Refinement);
    let mut missing = Vec::new();
    let mut malformed = false;

    if !session.context.has_data("okr_data.objective") {
        missing.push("Objective draft to refine".to_string());
    }

    let score = match &quality.objective {
        Some(objective_score) => {
            let (overall, nan) = sanitize_score(objective_score.overall);
            malformed |= nan;

            let (outcome, nan) = sanitize_score(objective_score.dimensions.outcome_oriented);
            malformed |= nan;
            if outcome < 70.0 {
                missing.push("Outcome-oriented phrasing".to_string());
            }

            let (clarity, nan) = sanitize_score(objective_score.dimensions.clarity);
            malformed |= nan;
            if clarity < 70.0 {
                missing.push("Unambiguous wording".to_string());
            }

            let (time_bound, nan) = sanitize_score(objective_score.dimensions.time_bound);
            malformed |= nan;
            if time_bound < 60.0 {
                missing.push("Time-bound framing".to_string());
            }

            overall / 100.0
        }
        None => {
            missing.push("Quality assessment of the objective".to_string());
            0.0
        }
    };

    if malformed {
        missing.push("Valid quality scores (scorer returned malformed values)".to_string());
    }

    let ready = score >= config.quality_threshold
        && missing.is_empty()
        && session.turns_in_phase >= config.min_turns;

    if !ready && missing.is_empty() {
        if session.turns_in_phase < config.min_turns {
            missing.push(more_turns_needed(session.turns_in_phase, config.min_turns));
        } else {
            missing.push(quality_gap(score * 100.0, config.quality_threshold * 100.0));
        }
    }

    build(ConversationPhase::Refinement, score, missing, ready)
}

/// Key-result discovery: at least two collected key results before any
/// scoring happens. The score is the mean of per-key-result overalls, and
/// any individual result below 70 blocks the transition even if the mean
/// passes.
fn evaluate_kr_discovery(session: &Session, quality: &QualityScores) -> PhaseReadiness {
    let config = config_for(ConversationPhase::KrDiscovery);
    let key_results = &session.context.okr_data.key_results;

    if key_results.len() < 2 {
        return build(
            ConversationPhase::KrDiscovery,
            0.0,
            vec!["At least 2 key results (recommended: 2-4)".to_string()],
            false,
        );
    }

    let mut missing = Vec::new();
    let mut malformed = false;

    let mean = if quality.key_results.is_empty() {
        missing.push("Quality assessment of the key results".to_string());
        0.0
    } else {
        let mut sum = 0.0;
        for (i, kr) in quality.key_results.iter().enumerate() {
            let (overall, nan) = sanitize_score(kr.overall);
            malformed |= nan;
            if overall < 70.0 {
                missing.push(format!("Key result {} needs stronger measurability", i + 1));
            }
            sum += overall;
        }
        sum / quality.key_results.len() as f64
    };

    if malformed {
        missing.push("Valid quality scores (scorer returned malformed values)".to_string());
    }

    let ready = mean >= 70.0
        && missing.is_empty()
        && session.turns_in_phase >= config.min_turns;

    if !ready && session.turns_in_phase < config.min_turns && missing.is_empty() {
        missing.push(more_turns_needed(session.turns_in_phase, config.min_turns));
    }

    build(ConversationPhase::KrDiscovery, mean / 100.0, missing, ready)
}

/// Validation: score resolves through a priority cascade (objective overall,
/// then composite overall, then mean key-result score). Explicit user
/// confirmation alone is sufficient here; this is the only phase where it
/// overrides the quality floor, because validation is the human sign-off
/// step.
fn evaluate_validation(session: &Session, quality: &QualityScores) -> PhaseReadiness {
    let config = config_for(ConversationPhase::Validation);
    let mut missing = Vec::new();

    let resolved = quality
        .objective
        .as_ref()
        .map(|o| o.overall)
        .or_else(|| quality.overall.as_ref().map(|o| o.score))
        .or_else(|| quality.mean_key_result_score());

    let score = match resolved {
        Some(raw) => {
            let (value, nan) = sanitize_score(raw);
            if nan {
                missing.push("Valid quality scores (scorer returned malformed values)".to_string());
            }
            value / 100.0
        }
        None => {
            missing.push("No quality data for final review".to_string());
            0.0
        }
    };

    let confirmed = session.context.user_confirmed;
    let quality_ready = score >= config.quality_threshold
        && missing.is_empty()
        && session.turns_in_phase >= config.min_turns;
    let ready = confirmed || quality_ready;

    if !ready && missing.is_empty() {
        if session.turns_in_phase < config.min_turns {
            missing.push(more_turns_needed(session.turns_in_phase, config.min_turns));
        } else {
            missing.push("Explicit user confirmation or a stronger overall score".to_string());
        }
    }

    build(ConversationPhase::Validation, score, missing, ready)
}

fn completed_readiness(signal: &SignalDetection) -> PhaseReadiness {
    PhaseReadiness {
        phase: ConversationPhase::Completed,
        readiness_score: 1.0,
        missing_elements: Vec::new(),
        ready_to_transition: false,
        next_phase: None,
        recommended_actions: Vec::new(),
        finalization_signal: signal.detected,
        signal: signal.clone(),
    }
}

fn build(
    phase: ConversationPhase,
    score: f64,
    missing: Vec<String>,
    ready: bool,
) -> PhaseReadiness {
    PhaseReadiness {
        phase,
        readiness_score: score.clamp(0.0, 1.0),
        missing_elements: missing,
        ready_to_transition: ready,
        next_phase: ready.then(|| phase.next()),
        recommended_actions: Vec::new(),
        finalization_signal: false,
        signal: SignalDetection {
            detected: false,
            strength: None,
            matched: Vec::new(),
            confidence: 0.0,
        },
    }
}

fn more_turns_needed(current: u32, required: u32) -> String {
    format!("More discussion needed ({} of {} turns)", current, required)
}

fn quality_gap(score: f64, threshold: f64) -> String {
    format!(
        "Stronger overall quality (score {:.0} of {:.0} required)",
        score, threshold
    )
}

/// Maps missing elements to conversational moves the coaching layer can take.
fn recommended_actions(
    phase: ConversationPhase,
    missing: &[String],
    ready: bool,
) -> Vec<String> {
    if ready {
        return vec![format!(
            "Confirm the user is ready to move on to {}",
            phase.next().label()
        )];
    }

    missing
        .iter()
        .map(|element| match element.as_str() {
            "Clear objective statement" => {
                "Ask what outcome the user wants to achieve this cycle".to_string()
            }
            "Outcome-oriented phrasing" => {
                "Steer the objective from activities toward outcomes".to_string()
            }
            "Unambiguous wording" => {
                "Ask the user to restate the objective in one plain sentence".to_string()
            }
            "At least 2 key results (recommended: 2-4)" => {
                "Ask for another measurable result that would prove progress".to_string()
            }
            "Quality assessment of the objective" | "Quality assessment of the key results" => {
                "Run the quality scorer on the current draft".to_string()
            }
            other => format!("Work on: {}", other),
        })
        .collect()
}
