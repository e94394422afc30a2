//! Phase state machine orchestrator.
//!
//! Ties evaluation, trigger decision, validation, snapshotting, mutation,
//! and event emission into one serialized sequence per session. Turns for
//! the same session are processed one at a time; different sessions proceed
//! in parallel and share only the internally synchronized snapshot manager
//! and event bus.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::Settings;
use crate::domain::foundation::{DomainError, ErrorCode, SessionId, SnapshotId};
use crate::domain::phase::{
    config_for, ConversationPhase, PhaseReadiness, ReadinessEvaluator, TransitionTrigger,
    TransitionValidator,
};
use crate::domain::session::{QualityScores, Session};
use crate::domain::snapshot::{
    RollbackError, RollbackManager, RollbackResult, SnapshotManager, SnapshotReason,
};
use crate::domain::transition::{
    SubscriptionId, TransitionEvent, TransitionEventBus, TransitionEventType,
};
use crate::ports::{QualityScorer, SessionStore, SessionUpdate, TransitionHandler};

/// Where a rollback should land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollbackTarget {
    /// The most recent snapshot.
    Previous,
    /// A specific snapshot by id.
    Snapshot(SnapshotId),
    /// The most recent snapshot taken in the given phase.
    Phase(ConversationPhase),
}

/// Result of one transition attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionOutcome {
    pub transitioned: bool,
    pub new_phase: Option<ConversationPhase>,

    /// Why the session stayed in its phase. Non-empty whenever
    /// `transitioned` is false.
    pub errors: Vec<String>,
}

impl TransitionOutcome {
    fn advanced(new_phase: ConversationPhase) -> Self {
        Self {
            transitioned: true,
            new_phase: Some(new_phase),
            errors: Vec::new(),
        }
    }

    fn blocked(errors: Vec<String>) -> Self {
        debug_assert!(!errors.is_empty());
        Self {
            transitioned: false,
            new_phase: None,
            errors,
        }
    }
}

/// Orchestrates phase progression for all sessions.
pub struct PhaseStateMachine {
    store: Arc<dyn SessionStore>,
    snapshots: Arc<SnapshotManager>,
    bus: Arc<TransitionEventBus>,
    evaluator: ReadinessEvaluator,
    validator: TransitionValidator,
    rollback_manager: RollbackManager,
    scorer: Option<Arc<dyn QualityScorer>>,
    session_locks: Mutex<HashMap<SessionId, Arc<Mutex<()>>>>,
}

impl PhaseStateMachine {
    /// Builds the orchestrator from its injected collaborators.
    pub fn new(
        store: Arc<dyn SessionStore>,
        snapshots: Arc<SnapshotManager>,
        bus: Arc<TransitionEventBus>,
        settings: &Settings,
    ) -> Self {
        Self {
            rollback_manager: RollbackManager::new(Arc::clone(&snapshots), Arc::clone(&store)),
            evaluator: ReadinessEvaluator::new(settings.signal_policy()),
            validator: TransitionValidator::new(),
            store,
            snapshots,
            bus,
            scorer: None,
            session_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Attaches a quality scorer, enabling `assess`.
    pub fn with_scorer(mut self, scorer: Arc<dyn QualityScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    /// Computes readiness for the session's current phase. Pure; identical
    /// inputs give identical results.
    pub fn evaluate_readiness(
        &self,
        session: &Session,
        quality: &QualityScores,
    ) -> PhaseReadiness {
        self.evaluator.evaluate(session, quality)
    }

    /// Scores the session's current draft through the attached scorer.
    ///
    /// # Errors
    ///
    /// - `InternalError` if no scorer was attached
    /// - scorer errors are passed through
    pub async fn assess(&self, session: &Session) -> Result<QualityScores, DomainError> {
        let scorer = self.scorer.as_ref().ok_or_else(|| {
            DomainError::new(ErrorCode::InternalError, "No quality scorer configured")
        })?;

        let mut quality = QualityScores::empty();

        if let Some(text) = session.context.okr_data.objective.as_deref() {
            if !text.trim().is_empty() {
                quality.objective = Some(scorer.score_objective(text, &session.context).await?);
            }
        }

        for key_result in &session.context.okr_data.key_results {
            quality
                .key_results
                .push(scorer.score_key_result(key_result, &session.context).await?);
        }

        if let Some(objective) = &quality.objective {
            quality.overall = Some(
                scorer
                    .calculate_overall(objective, &quality.key_results)
                    .await?,
            );
        }

        Ok(quality)
    }

    /// Evaluates the session and applies a phase transition if one is due.
    ///
    /// The sequence is: evaluate, decide trigger, emit `before`, validate,
    /// snapshot, mutate, emit `after`. A validation rejection emits `failed`
    /// and leaves the session untouched. Turns for the same session are
    /// serialized; callers must await completion before feeding the next
    /// turn.
    pub async fn attempt_transition(
        &self,
        session_id: SessionId,
        quality: &QualityScores,
    ) -> Result<TransitionOutcome, DomainError> {
        let lock = self.lock_for(session_id).await;
        let _guard = lock.lock().await;

        let session = self
            .store
            .get_session(session_id)
            .await?
            .ok_or_else(|| DomainError::session_not_found(session_id))?;

        if session.phase == ConversationPhase::Completed {
            return Ok(TransitionOutcome::blocked(vec![
                "Session is completed; no further transitions are possible".to_string(),
            ]));
        }

        let readiness = self.evaluator.evaluate(&session, quality);
        let trigger = match self.decide_trigger(&session, &readiness) {
            Some(trigger) => trigger,
            None => {
                tracing::debug!(
                    session_id = %session_id,
                    phase = ?session.phase,
                    score = readiness.readiness_score,
                    "no transition trigger this turn"
                );
                return Ok(TransitionOutcome::blocked(readiness.missing_elements));
            }
        };

        self.execute(&session, session.phase.next(), trigger, quality)
            .await
    }

    /// Forces a transition to an explicit target phase, bypassing readiness
    /// but not validation. Used by operator tooling.
    pub async fn force_transition(
        &self,
        session_id: SessionId,
        to: ConversationPhase,
        reason: impl Into<String>,
        quality: &QualityScores,
    ) -> Result<TransitionOutcome, DomainError> {
        let lock = self.lock_for(session_id).await;
        let _guard = lock.lock().await;

        let session = self
            .store
            .get_session(session_id)
            .await?
            .ok_or_else(|| DomainError::session_not_found(session_id))?;

        let trigger = TransitionTrigger::Forced {
            reason: reason.into(),
        };
        self.execute(&session, to, trigger, quality).await
    }

    /// Rolls the session back to the requested target.
    pub async fn rollback(
        &self,
        session_id: SessionId,
        target: RollbackTarget,
    ) -> Result<RollbackResult, RollbackError> {
        let lock = self.lock_for(session_id).await;
        let _guard = lock.lock().await;

        match target {
            RollbackTarget::Previous => self.rollback_manager.rollback_to_previous(session_id).await,
            RollbackTarget::Snapshot(id) => {
                self.rollback_manager
                    .rollback_to_snapshot(session_id, id)
                    .await
            }
            RollbackTarget::Phase(phase) => {
                self.rollback_manager
                    .rollback_to_phase(session_id, phase)
                    .await
            }
        }
    }

    /// Subscribes an observer to transition events.
    pub fn subscribe(
        &self,
        event_type: TransitionEventType,
        handler: Arc<dyn TransitionHandler>,
    ) -> SubscriptionId {
        self.bus.subscribe(event_type, handler)
    }

    /// Removes a previously registered observer.
    pub fn unsubscribe(&self, event_type: TransitionEventType, id: SubscriptionId) {
        self.bus.unsubscribe(event_type, id);
    }

    /// Trigger decision, in priority order: timeout beats everything (the
    /// phase must not stall forever), then explicit user approval, then the
    /// quality gate. No trigger means the session stays put this turn.
    fn decide_trigger(
        &self,
        session: &Session,
        readiness: &PhaseReadiness,
    ) -> Option<TransitionTrigger> {
        let config = config_for(session.phase);

        if config.timeout_turns > 0 && session.turns_in_phase >= config.timeout_turns {
            return Some(TransitionTrigger::Timeout {
                turns_in_phase: session.turns_in_phase,
                limit: config.timeout_turns,
            });
        }

        if !readiness.ready_to_transition {
            return None;
        }

        if session.phase == ConversationPhase::Validation && session.context.user_confirmed {
            return Some(TransitionTrigger::UserApproval {
                signal: "user_confirmed".to_string(),
                confidence: 1.0,
            });
        }

        if readiness.finalization_signal {
            return Some(TransitionTrigger::UserApproval {
                signal: readiness
                    .signal
                    .matched
                    .first()
                    .cloned()
                    .unwrap_or_default(),
                confidence: readiness.signal.confidence,
            });
        }

        Some(TransitionTrigger::QualityMet {
            score: readiness.readiness_score,
            threshold: config.quality_threshold,
        })
    }

    /// Validate, snapshot, mutate, emit - the committed tail of a
    /// transition. Once validation passes, mutation and the `after` event
    /// form one logical unit: a store failure emits `failed` and surfaces
    /// the error instead of leaving a half-applied turn.
    async fn execute(
        &self,
        session: &Session,
        to: ConversationPhase,
        trigger: TransitionTrigger,
        quality: &QualityScores,
    ) -> Result<TransitionOutcome, DomainError> {
        let event = TransitionEvent::new(
            session.id,
            session.phase,
            to,
            trigger,
            quality.clone(),
            session.messages.len(),
            session.turns_in_phase,
        );

        self.bus.emit(TransitionEventType::Before, event.clone()).await;

        let validation = self
            .validator
            .validate(session.phase, to, &session.context, quality);
        if !validation.valid {
            tracing::warn!(
                session_id = %session.id,
                from = ?session.phase,
                to = ?to,
                errors = ?validation.errors,
                "transition rejected by validator"
            );
            let failed = TransitionEvent {
                trigger: TransitionTrigger::ValidationFailed {
                    errors: validation.errors.clone(),
                },
                ..event
            }
            .failed(validation.errors.clone());
            self.bus.emit(TransitionEventType::Failed, failed).await;
            return Ok(TransitionOutcome::blocked(validation.errors));
        }

        self.snapshots.create_snapshot(
            session.id,
            session.phase,
            &session.context,
            quality,
            session.messages.len(),
            SnapshotReason::BeforeTransition,
        );

        if let Err(error) = self
            .store
            .update_session(session.id, SessionUpdate::phase(to))
            .await
        {
            let failed = event.clone().failed(vec![error.to_string()]);
            self.bus.emit(TransitionEventType::Failed, failed).await;
            return Err(error);
        }

        tracing::info!(
            session_id = %session.id,
            from = ?session.phase,
            to = ?to,
            trigger = %event.trigger,
            "phase transition applied"
        );
        self.bus.emit(TransitionEventType::After, event).await;

        Ok(TransitionOutcome::advanced(to))
    }

    async fn lock_for(&self, session_id: SessionId) -> Arc<Mutex<()>> {
        let mut locks = self.session_locks.lock().await;
        // A strong count of 1 means only the map holds the lock; dropping
        // those entries keeps the map bounded by the number of in-flight
        // sessions rather than every session id ever seen.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(session_id).or_default())
    }
}
