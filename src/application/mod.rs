//! Application layer - orchestration over the domain.

mod maintenance;
mod state_machine;

pub use maintenance::{MaintenanceReport, MaintenanceSweeper, SweeperHandle};
pub use state_machine::{PhaseStateMachine, RollbackTarget, TransitionOutcome};
