//! Quality score value objects.
//!
//! Scores are produced by an external scorer (see `ports::QualityScorer`) and
//! consumed here as opaque numeric input. All scores are on a 0-100 scale.
//! The state machine never computes scores itself; it only reads them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Coerces a raw score to a usable value.
///
/// Returns the score clamped to finite territory plus a flag indicating the
/// input was malformed (NaN or infinite). Malformed scores read as 0 and are
/// reported as missing elements rather than propagated.
pub fn sanitize_score(raw: f64) -> (f64, bool) {
    if raw.is_finite() {
        (raw.clamp(0.0, 100.0), false)
    } else {
        (0.0, true)
    }
}

/// Named quality dimensions of an objective draft.
///
/// Absent dimensions deserialize to 0 and count against the phase floors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ScoreDimensions {
    #[serde(default)]
    pub outcome_oriented: f64,
    #[serde(default)]
    pub inspirational: f64,
    #[serde(default)]
    pub clarity: f64,
    #[serde(default)]
    pub time_bound: f64,
    #[serde(default)]
    pub ambitious: f64,
}

/// Score for the objective draft: overall 0-100 plus named dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveScore {
    pub overall: f64,
    #[serde(default)]
    pub dimensions: ScoreDimensions,
}

impl ObjectiveScore {
    /// Convenience constructor with all dimensions set to the overall score.
    pub fn uniform(overall: f64) -> Self {
        Self {
            overall,
            dimensions: ScoreDimensions {
                outcome_oriented: overall,
                inspirational: overall,
                clarity: overall,
                time_bound: overall,
                ambitious: overall,
            },
        }
    }
}

/// Score for a single key result draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyResultScore {
    pub overall: f64,
    #[serde(default)]
    pub measurable: f64,
    #[serde(default)]
    pub specific: f64,
    #[serde(default)]
    pub achievable: f64,
}

impl KeyResultScore {
    /// Convenience constructor with all dimensions set to the overall score.
    pub fn uniform(overall: f64) -> Self {
        Self {
            overall,
            measurable: overall,
            specific: overall,
            achievable: overall,
        }
    }
}

/// Composite score across the objective and all key results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallScore {
    pub score: f64,
    #[serde(default)]
    pub breakdown: Map<String, Value>,
}

/// Per-turn snapshot of quality scores, produced by the external scorer.
///
/// All fields are optional; absence never errors downstream. A missing
/// objective score simply contributes 0 to readiness with a "needs
/// assessment" missing element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct QualityScores {
    #[serde(default)]
    pub objective: Option<ObjectiveScore>,
    #[serde(default)]
    pub key_results: Vec<KeyResultScore>,
    #[serde(default)]
    pub overall: Option<OverallScore>,
}

impl QualityScores {
    /// Empty scores (nothing assessed yet).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Mean of per-key-result overall scores, sanitized.
    ///
    /// Returns `None` when no key-result scores are present.
    pub fn mean_key_result_score(&self) -> Option<f64> {
        if self.key_results.is_empty() {
            return None;
        }
        let sum: f64 = self
            .key_results
            .iter()
            .map(|kr| sanitize_score(kr.overall).0)
            .sum();
        Some(sum / self.key_results.len() as f64)
    }
}
