//! Quality scorer port.
//!
//! Scoring free-text objectives and key results is natural-language work the
//! state machine deliberately does not own. It consumes the numbers this
//! port produces and nothing more.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::session::{KeyResultScore, ObjectiveScore, OverallScore, SessionContext};

/// Port for the external natural-language quality scorer.
#[async_trait]
pub trait QualityScorer: Send + Sync {
    /// Scores an objective draft, returning overall 0-100 plus dimensions.
    async fn score_objective(
        &self,
        text: &str,
        context: &SessionContext,
    ) -> Result<ObjectiveScore, DomainError>;

    /// Scores a single key result draft.
    async fn score_key_result(
        &self,
        text: &str,
        context: &SessionContext,
    ) -> Result<KeyResultScore, DomainError>;

    /// Computes a composite score across the objective and key results.
    async fn calculate_overall(
        &self,
        objective: &ObjectiveScore,
        key_results: &[KeyResultScore],
    ) -> Result<OverallScore, DomainError>;
}
