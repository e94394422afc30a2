//! Transition event bus with bounded audit history.
//!
//! Publishes before/after/failed events to subscribers and retains a
//! bounded, time-limited audit log. Handlers for one emit run concurrently;
//! a failing handler is logged and never blocks its siblings or the emit.
//!
//! Statistics are derived on demand from the retained history rather than
//! maintained incrementally. They therefore describe the retained window,
//! which is the window operators actually debug against.
//!
//! # Panics
//!
//! Methods panic if an internal lock is poisoned. No lock is held across an
//! await point.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{SessionId, Timestamp};
use crate::domain::phase::ConversationPhase;
use crate::ports::TransitionHandler;

use super::{TransitionEvent, TransitionEventType};

/// Default maximum retained audit records.
pub const DEFAULT_MAX_HISTORY: usize = 500;

/// Default audit retention window in seconds (24 hours).
pub const DEFAULT_RETENTION_SECS: u64 = 24 * 60 * 60;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// One retained audit entry: the emitted event plus its channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub event_type: TransitionEventType,
    pub event: TransitionEvent,
}

/// Aggregate statistics derived from the retained audit history.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TransitionStatistics {
    /// Completed attempts (after + failed); proposals are not counted.
    pub total_attempts: u64,
    pub succeeded: u64,
    pub failed: u64,

    /// Attempt counts keyed by trigger kind.
    pub by_trigger: HashMap<String, u64>,

    /// Attempt counts keyed by "from -> to".
    pub by_phase_pair: HashMap<String, u64>,

    /// Mean turns spent in each phase before successfully leaving it.
    pub avg_turns_in_phase: HashMap<ConversationPhase, f64>,
}

/// What a history sweep removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventSweepStats {
    pub removed_events: usize,
}

/// Publishes transition events and retains the audit log.
pub struct TransitionEventBus {
    handlers: RwLock<HashMap<TransitionEventType, Vec<(SubscriptionId, Arc<dyn TransitionHandler>)>>>,
    history: RwLock<VecDeque<TransitionRecord>>,
    next_subscription: AtomicU64,
    max_history: usize,
    retention_secs: u64,
}

impl TransitionEventBus {
    /// Creates a bus with the given history cap and retention window.
    pub fn new(max_history: usize, retention_secs: u64) -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            history: RwLock::new(VecDeque::new()),
            next_subscription: AtomicU64::new(1),
            max_history: max_history.max(1),
            retention_secs,
        }
    }

    /// Registers a handler for one event type.
    pub fn subscribe(
        &self,
        event_type: TransitionEventType,
        handler: Arc<dyn TransitionHandler>,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .write()
            .expect("TransitionEventBus: handlers lock poisoned")
            .entry(event_type)
            .or_default()
            .push((id, handler));
        id
    }

    /// Removes a previously registered handler. Unknown ids are a no-op.
    pub fn unsubscribe(&self, event_type: TransitionEventType, id: SubscriptionId) {
        if let Some(entries) = self
            .handlers
            .write()
            .expect("TransitionEventBus: handlers lock poisoned")
            .get_mut(&event_type)
        {
            entries.retain(|(entry_id, _)| *entry_id != id);
        }
    }

    /// Records the event and invokes all handlers for its type.
    ///
    /// Handlers run concurrently and the call returns once all have
    /// finished. A handler error is logged against the handler's name and
    /// does not affect siblings or the caller.
    pub async fn emit(&self, event_type: TransitionEventType, event: TransitionEvent) {
        {
            let mut history = self
                .history
                .write()
                .expect("TransitionEventBus: history lock poisoned");
            history.push_back(TransitionRecord {
                event_type,
                event: event.clone(),
            });
            while history.len() > self.max_history {
                history.pop_front();
            }
        }

        // Snapshot handlers so the lock is released before any await
        let handlers: Vec<(SubscriptionId, Arc<dyn TransitionHandler>)> = self
            .handlers
            .read()
            .expect("TransitionEventBus: handlers lock poisoned")
            .get(&event_type)
            .cloned()
            .unwrap_or_default();

        if handlers.is_empty() {
            return;
        }

        let results = join_all(handlers.iter().map(|(_, handler)| {
            let event = event.clone();
            async move { (handler.name(), handler.handle(event).await) }
        }))
        .await;

        for (name, result) in results {
            if let Err(error) = result {
                tracing::warn!(
                    handler = name,
                    event_type = event_type.as_str(),
                    session_id = %event.session_id,
                    %error,
                    "transition handler failed"
                );
            }
        }
    }

    /// All retained records for one session, oldest first.
    pub fn history_for_session(&self, session_id: SessionId) -> Vec<TransitionRecord> {
        self.history
            .read()
            .expect("TransitionEventBus: history lock poisoned")
            .iter()
            .filter(|r| r.event.session_id == session_id)
            .cloned()
            .collect()
    }

    /// The most recent records across all sessions, newest first.
    pub fn recent_events(&self, limit: usize) -> Vec<TransitionRecord> {
        self.history
            .read()
            .expect("TransitionEventBus: history lock poisoned")
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    /// Derives aggregate statistics from the retained history.
    pub fn statistics(&self) -> TransitionStatistics {
        let history = self
            .history
            .read()
            .expect("TransitionEventBus: history lock poisoned");

        let mut stats = TransitionStatistics::default();
        let mut turns_sum: HashMap<ConversationPhase, (u64, u64)> = HashMap::new();

        for record in history.iter() {
            match record.event_type {
                TransitionEventType::Before => continue,
                TransitionEventType::After => {
                    stats.succeeded += 1;
                    let entry = turns_sum.entry(record.event.from).or_default();
                    entry.0 += u64::from(record.event.turns_in_phase);
                    entry.1 += 1;
                }
                TransitionEventType::Failed => stats.failed += 1,
            }

            stats.total_attempts += 1;
            *stats
                .by_trigger
                .entry(record.event.trigger.kind().to_string())
                .or_default() += 1;
            *stats
                .by_phase_pair
                .entry(format!(
                    "{} -> {}",
                    record.event.from.label(),
                    record.event.to.label()
                ))
                .or_default() += 1;
        }

        for (phase, (sum, count)) in turns_sum {
            stats
                .avg_turns_in_phase
                .insert(phase, sum as f64 / count as f64);
        }

        stats
    }

    /// Purges records older than the retention window.
    pub fn sweep(&self, now: Timestamp) -> EventSweepStats {
        let mut history = self
            .history
            .write()
            .expect("TransitionEventBus: history lock poisoned");
        let before = history.len();
        history.retain(|r| r.event.age_secs(now) <= self.retention_secs);
        EventSweepStats {
            removed_events: before - history.len(),
        }
    }
}

impl Default for TransitionEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY, DEFAULT_RETENTION_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{DomainError, ErrorCode};
    use crate::domain::phase::TransitionTrigger;
    use crate::domain::session::QualityScores;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    fn sample_event(session_id: SessionId) -> TransitionEvent {
        TransitionEvent::new(
            session_id,
            ConversationPhase::Discovery,
            ConversationPhase::Refinement,
            TransitionTrigger::QualityMet {
                score: 0.8,
                threshold: 0.7,
            },
            QualityScores::empty(),
            4,
            2,
        )
    }

    struct CountingHandler(Arc<AtomicUsize>);

    #[async_trait]
    impl TransitionHandler for CountingHandler {
        async fn handle(&self, _: TransitionEvent) -> Result<(), DomainError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn name(&self) -> &'static str {
            "CountingHandler"
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl TransitionHandler for FailingHandler {
        async fn handle(&self, _: TransitionEvent) -> Result<(), DomainError> {
            Err(DomainError::new(ErrorCode::InternalError, "handler broke"))
        }
        fn name(&self) -> &'static str {
            "FailingHandler"
        }
    }

    #[tokio::test]
    async fn emit_records_history_and_invokes_handlers() {
        let bus = TransitionEventBus::default();
        let counter = Arc::new(AtomicUsize::new(0));
        bus.subscribe(
            TransitionEventType::After,
            Arc::new(CountingHandler(counter.clone())),
        );

        let session_id = SessionId::new();
        bus.emit(TransitionEventType::After, sample_event(session_id))
            .await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(bus.history_for_session(session_id).len(), 1);
    }

    #[tokio::test]
    async fn handlers_only_receive_their_event_type() {
        let bus = TransitionEventBus::default();
        let counter = Arc::new(AtomicUsize::new(0));
        bus.subscribe(
            TransitionEventType::Failed,
            Arc::new(CountingHandler(counter.clone())),
        );

        bus.emit(TransitionEventType::After, sample_event(SessionId::new()))
            .await;

        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failing_handler_does_not_block_siblings() {
        let bus = TransitionEventBus::default();
        let counter = Arc::new(AtomicUsize::new(0));
        bus.subscribe(TransitionEventType::After, Arc::new(FailingHandler));
        bus.subscribe(
            TransitionEventType::After,
            Arc::new(CountingHandler(counter.clone())),
        );
        bus.subscribe(TransitionEventType::After, Arc::new(FailingHandler));

        // Must not error or panic
        bus.emit(TransitionEventType::After, sample_event(SessionId::new()))
            .await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let bus = TransitionEventBus::default();
        let counter = Arc::new(AtomicUsize::new(0));
        let id = bus.subscribe(
            TransitionEventType::After,
            Arc::new(CountingHandler(counter.clone())),
        );

        bus.unsubscribe(TransitionEventType::After, id);
        bus.emit(TransitionEventType::After, sample_event(SessionId::new()))
            .await;

        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn history_is_bounded_by_count() {
        let bus = TransitionEventBus::new(3, DEFAULT_RETENTION_SECS);
        let session_id = SessionId::new();

        for _ in 0..5 {
            bus.emit(TransitionEventType::After, sample_event(session_id))
                .await;
        }

        assert_eq!(bus.history_for_session(session_id).len(), 3);
    }

    #[tokio::test]
    async fn recent_events_are_newest_first() {
        let bus = TransitionEventBus::default();
        let first = SessionId::new();
        let second = SessionId::new();

        bus.emit(TransitionEventType::After, sample_event(first))
            .await;
        bus.emit(TransitionEventType::Failed, sample_event(second))
            .await;

        let recent = bus.recent_events(1);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].event.session_id, second);
    }

    #[tokio::test]
    async fn sweep_purges_old_events() {
        let bus = TransitionEventBus::new(100, 3600);
        let event = sample_event(SessionId::new());
        let created = event.occurred_at;
        bus.emit(TransitionEventType::After, event).await;

        assert_eq!(bus.sweep(created.plus_secs(3599)).removed_events, 0);
        assert_eq!(bus.sweep(created.plus_secs(3601)).removed_events, 1);
        assert!(bus.recent_events(10).is_empty());
    }

    #[tokio::test]
    async fn statistics_are_derived_from_history() {
        let bus = TransitionEventBus::default();
        let session_id = SessionId::new();

        // A proposal, a success, and a failure
        bus.emit(TransitionEventType::Before, sample_event(session_id))
            .await;
        bus.emit(TransitionEventType::After, sample_event(session_id))
            .await;
        bus.emit(
            TransitionEventType::Failed,
            sample_event(session_id).failed(vec!["bad ordering".to_string()]),
        )
        .await;

        let stats = bus.statistics();
        assert_eq!(stats.total_attempts, 2);
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.by_trigger.get("quality_met"), Some(&2));
        assert_eq!(stats.by_phase_pair.get("Discovery -> Refinement"), Some(&2));
        assert_eq!(
            stats.avg_turns_in_phase.get(&ConversationPhase::Discovery),
            Some(&2.0)
        );
    }
}
