//! Background retention maintenance.
//!
//! Snapshots and audit events are bounded by count at write time, but the
//! time-based retention windows need a periodic sweep. The sweeper owns that
//! schedule; `run_once` is the whole sweep and is callable directly with an
//! explicit clock for deterministic tests.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::domain::foundation::Timestamp;
use crate::domain::snapshot::{SnapshotManager, SweepStats};
use crate::domain::transition::{EventSweepStats, TransitionEventBus};

/// What one maintenance pass removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaintenanceReport {
    pub snapshots: SweepStats,
    pub events: EventSweepStats,
}

/// Periodically purges expired snapshots and audit events.
pub struct MaintenanceSweeper {
    snapshots: Arc<SnapshotManager>,
    bus: Arc<TransitionEventBus>,
}

impl MaintenanceSweeper {
    pub fn new(snapshots: Arc<SnapshotManager>, bus: Arc<TransitionEventBus>) -> Self {
        Self { snapshots, bus }
    }

    /// Runs one sweep against the given clock.
    pub fn run_once(&self, now: Timestamp) -> MaintenanceReport {
        let report = MaintenanceReport {
            snapshots: self.snapshots.sweep(now),
            events: self.bus.sweep(now),
        };

        if report.snapshots.removed_snapshots > 0 || report.events.removed_events > 0 {
            tracing::info!(
                removed_snapshots = report.snapshots.removed_snapshots,
                removed_sessions = report.snapshots.removed_sessions,
                removed_events = report.events.removed_events,
                "maintenance sweep purged expired records"
            );
        }

        report
    }

    /// Spawns the sweep loop on the current runtime. The first sweep happens
    /// after one full interval.
    pub fn spawn(self, interval: Duration) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The interval fires immediately once; consume that tick
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.run_once(Timestamp::now());
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            tracing::debug!("maintenance sweeper shutting down");
                            return;
                        }
                    }
                }
            }
        });

        SweeperHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Handle to a running sweeper task.
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signals the sweep loop to stop and waits for it to finish.
    pub async fn shutdown(self) {
        // Receiver gone means the task already exited
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }

    /// Aborts the task without waiting.
    pub fn abort(&self) {
        self.task.abort();
    }
}
