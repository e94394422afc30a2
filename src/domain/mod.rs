//! Domain layer - phase state machine core.

pub mod foundation;
pub mod phase;
pub mod session;
pub mod snapshot;
pub mod transition;
