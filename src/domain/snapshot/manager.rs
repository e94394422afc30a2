//! Bounded per-session snapshot storage.
//!
//! Snapshots are held per session in creation order, capped at a fixed count
//! (oldest evicted first) and purged by an age-based sweep. The manager is
//! internally synchronized; it is shared across session-processing tasks.
//!
//! # Panics
//!
//! Methods panic if the internal lock is poisoned, which only happens after
//! a panic while holding the lock. No code path holds the lock across other
//! calls.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::foundation::{SessionId, SnapshotId, Timestamp};
use crate::domain::phase::ConversationPhase;
use crate::domain::session::{QualityScores, SessionContext};

use super::{SnapshotReason, StateSnapshot};

/// Default maximum snapshots retained per session.
pub const DEFAULT_MAX_PER_SESSION: usize = 20;

/// Default retention window in seconds (24 hours).
pub const DEFAULT_RETENTION_SECS: u64 = 24 * 60 * 60;

/// What a sweep removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepStats {
    pub removed_snapshots: usize,
    pub removed_sessions: usize,
}

/// Stores bounded, time-limited snapshot history per session.
pub struct SnapshotManager {
    snapshots: RwLock<HashMap<SessionId, Vec<StateSnapshot>>>,
    max_per_session: usize,
    retention_secs: u64,
}

impl SnapshotManager {
    /// Creates a manager with the given per-session cap and retention window.
    pub fn new(max_per_session: usize, retention_secs: u64) -> Self {
        Self {
            snapshots: RwLock::new(HashMap::new()),
            max_per_session: max_per_session.max(1),
            retention_secs,
        }
    }

    /// Captures and stores a snapshot, evicting the oldest entry if the
    /// session is at its cap. Returns a clone of the stored snapshot.
    pub fn create_snapshot(
        &self,
        session_id: SessionId,
        phase: ConversationPhase,
        context: &SessionContext,
        quality: &QualityScores,
        message_count: usize,
        reason: SnapshotReason,
    ) -> StateSnapshot {
        let snapshot =
            StateSnapshot::capture(session_id, phase, context, quality, message_count, reason);

        let mut store = self
            .snapshots
            .write()
            .expect("SnapshotManager: snapshots lock poisoned");
        let entries = store.entry(session_id).or_default();
        entries.push(snapshot.clone());
        if entries.len() > self.max_per_session {
            let evicted = entries.remove(0);
            tracing::debug!(
                session_id = %session_id,
                snapshot_id = %evicted.id,
                "evicted oldest snapshot at cap"
            );
        }

        snapshot
    }

    /// The most recent snapshot, i.e. one step back from the live state.
    pub fn latest_snapshot(&self, session_id: SessionId) -> Option<StateSnapshot> {
        self.snapshot_back_n(session_id, 1)
    }

    /// Alias for the most recent snapshot, matching rollback-to-previous.
    pub fn previous_snapshot(&self, session_id: SessionId) -> Option<StateSnapshot> {
        self.snapshot_back_n(session_id, 1)
    }

    /// The snapshot `n` steps back from the live state: `n = 1` is the most
    /// recent snapshot, `n = 2` the one before it. `n = 0` is out of range.
    pub fn snapshot_back_n(&self, session_id: SessionId, n: usize) -> Option<StateSnapshot> {
        if n == 0 {
            return None;
        }
        let store = self
            .snapshots
            .read()
            .expect("SnapshotManager: snapshots lock poisoned");
        let entries = store.get(&session_id)?;
        entries.iter().rev().nth(n - 1).cloned()
    }

    /// Looks a snapshot up by id within a session.
    pub fn snapshot_by_id(
        &self,
        session_id: SessionId,
        snapshot_id: SnapshotId,
    ) -> Option<StateSnapshot> {
        let store = self
            .snapshots
            .read()
            .expect("SnapshotManager: snapshots lock poisoned");
        store
            .get(&session_id)?
            .iter()
            .find(|s| s.id == snapshot_id)
            .cloned()
    }

    /// The most recent snapshot captured in the given phase, if any.
    pub fn latest_snapshot_for_phase(
        &self,
        session_id: SessionId,
        phase: ConversationPhase,
    ) -> Option<StateSnapshot> {
        let store = self
            .snapshots
            .read()
            .expect("SnapshotManager: snapshots lock poisoned");
        store
            .get(&session_id)?
            .iter()
            .rev()
            .find(|s| s.phase == phase)
            .cloned()
    }

    /// Whether the session has at least one snapshot to roll back to.
    pub fn can_rollback(&self, session_id: SessionId) -> bool {
        self.snapshot_count(session_id) > 0
    }

    /// Number of snapshots currently retained for the session.
    pub fn snapshot_count(&self, session_id: SessionId) -> usize {
        self.snapshots
            .read()
            .expect("SnapshotManager: snapshots lock poisoned")
            .get(&session_id)
            .map_or(0, Vec::len)
    }

    /// Purges snapshots older than the retention window, removing sessions
    /// left with no snapshots. The expired list is swapped out under the
    /// write lock; nothing else happens while it is held.
    pub fn sweep(&self, now: Timestamp) -> SweepStats {
        let mut stats = SweepStats::default();
        let mut store = self
            .snapshots
            .write()
            .expect("SnapshotManager: snapshots lock poisoned");

        store.retain(|session_id, entries| {
            let before = entries.len();
            entries.retain(|s| s.age_secs(now) <= self.retention_secs);
            stats.removed_snapshots += before - entries.len();

            if entries.is_empty() {
                tracing::debug!(session_id = %session_id, "removed session with no snapshots");
                stats.removed_sessions += 1;
                false
            } else {
                true
            }
        });

        stats
    }
}

impl Default for SnapshotManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PER_SESSION, DEFAULT_RETENTION_SECS)
    }
}
