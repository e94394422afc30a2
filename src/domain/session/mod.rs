//! Session domain - the conversation aggregate and its quality inputs.

mod message;
mod quality;
mod session;

pub use message::{Message, Role};
pub use quality::{
    sanitize_score, KeyResultScore, ObjectiveScore, OverallScore, QualityScores, ScoreDimensions,
};
pub use session::{OkrData, Session, SessionContext};
