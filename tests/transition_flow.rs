//! Integration tests for the phase transition lifecycle.
//!
//! These tests verify the end-to-end flow:
//! 1. Readiness evaluation gates each phase on its own criteria
//! 2. Transitions emit before/after/failed events to subscribers
//! 3. A snapshot is taken before every mutation and rollback restores it
//! 4. Statistics derived from the audit history reflect what happened
//!
//! Uses in-memory implementations throughout.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use okr_coach::adapters::InMemorySessionStore;
use okr_coach::application::{PhaseStateMachine, RollbackTarget};
use okr_coach::config::Settings;
use okr_coach::domain::foundation::DomainError;
use okr_coach::domain::phase::ConversationPhase;
use okr_coach::domain::session::{
    KeyResultScore, Message, ObjectiveScore, OverallScore, QualityScores, Session, SessionContext,
};
use okr_coach::domain::transition::{TransitionEvent, TransitionEventBus, TransitionEventType};
use okr_coach::ports::{QualityScorer, SessionStore, TransitionHandler};

// =============================================================================
// Test Infrastructure
// =============================================================================

struct CountingHandler {
    count: Arc<AtomicUsize>,
}

#[async_trait]
impl TransitionHandler for CountingHandler {
    async fn handle(&self, _: TransitionEvent) -> Result<(), DomainError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "CountingHandler"
    }
}

/// Fixed-score scorer for exercising the assess path.
struct FixedScorer {
    objective: f64,
    key_result: f64,
}

#[async_trait]
impl QualityScorer for FixedScorer {
    async fn score_objective(
        &self,
        _text: &str,
        _context: &SessionContext,
    ) -> Result<ObjectiveScore, DomainError> {
        Ok(ObjectiveScore::uniform(self.objective))
    }

    async fn score_key_result(
        &self,
        _text: &str,
        _context: &SessionContext,
    ) -> Result<KeyResultScore, DomainError> {
        Ok(KeyResultScore::uniform(self.key_result))
    }

    async fn calculate_overall(
        &self,
        objective: &ObjectiveScore,
        key_results: &[KeyResultScore],
    ) -> Result<OverallScore, DomainError> {
        let mean_kr = if key_results.is_empty() {
            objective.overall
        } else {
            key_results.iter().map(|k| k.overall).sum::<f64>() / key_results.len() as f64
        };
        Ok(OverallScore {
            score: (objective.overall + mean_kr) / 2.0,
            breakdown: Default::default(),
        })
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

struct Harness {
    store: Arc<InMemorySessionStore>,
    bus: Arc<TransitionEventBus>,
    machine: PhaseStateMachine,
}

fn harness() -> Harness {
    init_tracing();
    let settings = Settings::default();
    let store = Arc::new(InMemorySessionStore::new());
    let snapshots = Arc::new(settings.snapshot_manager());
    let bus = Arc::new(settings.event_bus());
    let machine = PhaseStateMachine::new(
        Arc::clone(&store) as Arc<dyn SessionStore>,
        snapshots,
        Arc::clone(&bus),
        &settings,
    )
    .with_scorer(Arc::new(FixedScorer {
        objective: 85.0,
        key_result: 82.0,
    }));

    Harness {
        store,
        bus,
        machine,
    }
}

/// A session with a solid objective draft and enough discussion turns.
fn seeded_session() -> Session {
    let mut session = Session::new();
    session.context.okr_data.objective =
        Some("Increase customer retention to 95% by end of Q4".to_string());
    session.add_message(Message::user("I want to work on retention").unwrap());
    session.add_message(Message::assistant("What outcome would success look like?").unwrap());
    session.add_message(Message::user("Retention at 95% by year end").unwrap());
    session
}

fn add_user_turns(session: &mut Session, n: usize) {
    for i in 0..n {
        session.add_message(Message::user(format!("more discussion {}", i)).unwrap());
    }
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn session_progresses_through_every_phase_to_completion() {
    let h = harness();
    let after_count = Arc::new(AtomicUsize::new(0));
    h.machine.subscribe(
        TransitionEventType::After,
        Arc::new(CountingHandler {
            count: Arc::clone(&after_count),
        }),
    );

    let session = seeded_session();
    let id = session.id;
    h.store.insert(session).await;

    // Discovery -> Refinement: draft plus good objective score
    let quality = h
        .machine
        .assess(&h.store.get_session(id).await.unwrap().unwrap())
        .await
        .unwrap();
    let outcome = h.machine.attempt_transition(id, &quality).await.unwrap();
    assert_eq!(outcome.new_phase, Some(ConversationPhase::Refinement));

    // Refinement -> KrDiscovery: objective overall clears 0.75 with clean
    // dimensions, after the minimum discussion turns
    let mut session = h.store.get_session(id).await.unwrap().unwrap();
    add_user_turns(&mut session, 2);
    h.store.insert(session.clone()).await;
    let quality = h.machine.assess(&session).await.unwrap();
    let outcome = h.machine.attempt_transition(id, &quality).await.unwrap();
    assert_eq!(outcome.new_phase, Some(ConversationPhase::KrDiscovery));

    // KrDiscovery -> Validation: two strong key results
    let mut session = h.store.get_session(id).await.unwrap().unwrap();
    session.context.okr_data.key_results = vec![
        "Raise NPS from 30 to 50".to_string(),
        "Reduce monthly churn from 4% to 2%".to_string(),
    ];
    add_user_turns(&mut session, 3);
    h.store.insert(session.clone()).await;
    let quality = h.machine.assess(&session).await.unwrap();
    let outcome = h.machine.attempt_transition(id, &quality).await.unwrap();
    assert_eq!(outcome.new_phase, Some(ConversationPhase::Validation));

    // Validation -> Completed: user confirms
    let mut session = h.store.get_session(id).await.unwrap().unwrap();
    session.context.user_confirmed = true;
    add_user_turns(&mut session, 1);
    h.store.insert(session.clone()).await;
    let quality = h.machine.assess(&session).await.unwrap();
    let outcome = h.machine.attempt_transition(id, &quality).await.unwrap();
    assert_eq!(outcome.new_phase, Some(ConversationPhase::Completed));

    // Four applied transitions, each observed by the subscriber
    assert_eq!(after_count.load(Ordering::SeqCst), 4);

    // Terminal: nothing further happens
    let outcome = h.machine.attempt_transition(id, &quality).await.unwrap();
    assert!(!outcome.transitioned);

    let stats = h.bus.statistics();
    assert_eq!(stats.succeeded, 4);
    assert_eq!(stats.failed, 0);
    assert_eq!(
        stats.by_phase_pair.get("Validation -> Completed"),
        Some(&1)
    );
}

#[tokio::test]
async fn skip_attempt_fails_with_audit_and_no_mutation() {
    let h = harness();
    let failed_count = Arc::new(AtomicUsize::new(0));
    h.machine.subscribe(
        TransitionEventType::Failed,
        Arc::new(CountingHandler {
            count: Arc::clone(&failed_count),
        }),
    );

    let session = seeded_session();
    let id = session.id;
    h.store.insert(session).await;

    let quality = QualityScores {
        objective: Some(ObjectiveScore::uniform(90.0)),
        ..Default::default()
    };
    let outcome = h
        .machine
        .force_transition(id, ConversationPhase::Validation, "skip test", &quality)
        .await
        .unwrap();

    assert!(!outcome.transitioned);
    assert!(!outcome.errors.is_empty());
    assert_eq!(failed_count.load(Ordering::SeqCst), 1);

    let stored = h.store.get_session(id).await.unwrap().unwrap();
    assert_eq!(stored.phase, ConversationPhase::Discovery);

    let failed: Vec<_> = h
        .bus
        .history_for_session(id)
        .into_iter()
        .filter(|r| r.event_type == TransitionEventType::Failed)
        .collect();
    assert_eq!(failed.len(), 1);
    assert!(!failed[0].event.success);
    assert_eq!(failed[0].event.errors, outcome.errors);
}

#[tokio::test]
async fn rollback_restores_the_pre_transition_state() {
    let h = harness();
    let session = seeded_session();
    let id = session.id;
    let original_context = session.context.clone();
    h.store.insert(session).await;

    let quality = QualityScores {
        objective: Some(ObjectiveScore::uniform(85.0)),
        ..Default::default()
    };
    h.machine.attempt_transition(id, &quality).await.unwrap();
    assert_eq!(
        h.store.get_session(id).await.unwrap().unwrap().phase,
        ConversationPhase::Refinement
    );

    let result = h
        .machine
        .rollback(id, RollbackTarget::Previous)
        .await
        .unwrap();
    assert_eq!(result.restored_phase, ConversationPhase::Discovery);

    let restored = h.store.get_session(id).await.unwrap().unwrap();
    assert_eq!(restored.phase, ConversationPhase::Discovery);
    assert_eq!(restored.context, original_context);
}

#[tokio::test]
async fn rollback_to_phase_reaches_back_across_transitions() {
    let h = harness();
    let mut session = seeded_session();
    add_user_turns(&mut session, 2);
    let id = session.id;
    h.store.insert(session).await;

    let quality = QualityScores {
        objective: Some(ObjectiveScore::uniform(85.0)),
        ..Default::default()
    };
    // Discovery -> Refinement, then Refinement -> KrDiscovery
    h.machine.attempt_transition(id, &quality).await.unwrap();
    let mut session = h.store.get_session(id).await.unwrap().unwrap();
    add_user_turns(&mut session, 2);
    h.store.insert(session).await;
    h.machine.attempt_transition(id, &quality).await.unwrap();

    let result = h
        .machine
        .rollback(id, RollbackTarget::Phase(ConversationPhase::Discovery))
        .await
        .unwrap();
    assert_eq!(result.restored_phase, ConversationPhase::Discovery);
}

#[tokio::test]
async fn blocked_transition_reports_what_is_missing() {
    let h = harness();
    let mut session = Session::new();
    session.add_message(Message::user("hi").unwrap());
    session.add_message(Message::user("I have no idea yet").unwrap());
    let id = session.id;
    h.store.insert(session).await;

    let outcome = h
        .machine
        .attempt_transition(id, &QualityScores::empty())
        .await
        .unwrap();

    assert!(!outcome.transitioned);
    assert!(outcome
        .errors
        .contains(&"Clear objective statement".to_string()));
    // Nothing was proposed, so the audit log stays empty
    assert!(h.bus.history_for_session(id).is_empty());
}

#[tokio::test]
async fn statistics_track_triggers_across_sessions() {
    let h = harness();

    // One quality-met transition
    let first = seeded_session();
    h.store.insert(first.clone()).await;
    let quality = QualityScores {
        objective: Some(ObjectiveScore::uniform(85.0)),
        ..Default::default()
    };
    h.machine
        .attempt_transition(first.id, &quality)
        .await
        .unwrap();

    // One timed-out transition
    let mut second = Session::new();
    second.context.okr_data.objective = Some("A rough idea of a goal".to_string());
    add_user_turns(&mut second, 12);
    h.store.insert(second.clone()).await;
    h.machine
        .attempt_transition(second.id, &QualityScores::empty())
        .await
        .unwrap();

    let stats = h.bus.statistics();
    assert_eq!(stats.succeeded, 2);
    assert_eq!(stats.by_trigger.get("quality_met"), Some(&1));
    assert_eq!(stats.by_trigger.get("timeout"), Some(&1));
    assert_eq!(
        stats.by_phase_pair.get("Discovery -> Refinement"),
        Some(&2)
    );
}
