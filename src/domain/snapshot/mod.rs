//! Snapshot domain - point-in-time capture and recovery of session state.

mod manager;
mod rollback;
mod snapshot;

pub use manager::{SnapshotManager, SweepStats, DEFAULT_MAX_PER_SESSION, DEFAULT_RETENTION_SECS};
pub use rollback::{RollbackError, RollbackManager, RollbackResult};
pub use snapshot::{SnapshotReason, StateSnapshot};
