//! Ports - interfaces to external collaborators.
//!
//! The state machine core performs no I/O of its own. Everything it needs
//! from the outside world (session persistence, quality scoring, event
//! observation) comes through these traits.

mod quality_scorer;
mod session_store;
mod transition_handler;

pub use quality_scorer::QualityScorer;
pub use session_store::{SessionStore, SessionUpdate};
pub use transition_handler::TransitionHandler;
