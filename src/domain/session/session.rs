//! Session aggregate for the OKR authoring conversation.
//!
//! A session owns the current phase, the collected OKR draft data, and the
//! message history. Phase progression is decided elsewhere (the phase state
//! machine); the aggregate only enforces local invariants such as turn
//! counting and phase bookkeeping.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::foundation::{SessionId, Timestamp};
use crate::domain::phase::ConversationPhase;
use crate::domain::session::{Message, Role};

/// The OKR draft collected over the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OkrData {
    /// The objective statement, once a draft exists.
    #[serde(default)]
    pub objective: Option<String>,

    /// Collected key result statements.
    #[serde(default)]
    pub key_results: Vec<String>,
}

/// Mutable conversation context restored on rollback.
///
/// `extra` carries application-defined data the state machine does not
/// interpret but must snapshot and restore faithfully.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SessionContext {
    #[serde(default)]
    pub okr_data: OkrData,

    /// Explicit user sign-off, honored only by the validation phase.
    #[serde(default)]
    pub user_confirmed: bool,

    #[serde(default)]
    pub extra: Map<String, Value>,
}

impl SessionContext {
    /// Resolves a dot-path (e.g. `okr_data.objective`) and reports whether
    /// the value is present and non-empty.
    ///
    /// Strings must be non-blank, arrays non-empty. Unknown leading segments
    /// are looked up in `extra`.
    pub fn has_data(&self, path: &str) -> bool {
        match path {
            "okr_data.objective" => self
                .okr_data
                .objective
                .as_deref()
                .is_some_and(|o| !o.trim().is_empty()),
            "okr_data.key_results" => !self.okr_data.key_results.is_empty(),
            "user_confirmed" => self.user_confirmed,
            _ => {
                let mut current: Option<&Value> = None;
                for (i, segment) in path.split('.').enumerate() {
                    current = match (i, current) {
                        (0, _) => self.extra.get(segment),
                        (_, Some(Value::Object(map))) => map.get(segment),
                        _ => None,
                    };
                }
                match current {
                    Some(Value::Null) | None => false,
                    Some(Value::String(s)) => !s.trim().is_empty(),
                    Some(Value::Array(items)) => !items.is_empty(),
                    Some(_) => true,
                }
            }
        }
    }
}

/// Session aggregate root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub phase: ConversationPhase,
    pub context: SessionContext,
    pub messages: Vec<Message>,

    /// User turns taken since the last phase change.
    pub turns_in_phase: u32,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Session {
    /// Creates a new session in the discovery phase.
    pub fn new() -> Self {
        let now = Timestamp::now();
        Self {
            id: SessionId::new(),
            phase: ConversationPhase::Discovery,
            context: SessionContext::default(),
            messages: Vec::new(),
            turns_in_phase: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Appends a message, counting user messages as turns.
    pub fn add_message(&mut self, message: Message) {
        if message.role() == Role::User {
            self.turns_in_phase += 1;
        }
        self.messages.push(message);
        self.updated_at = Timestamp::now();
    }

    /// Total user turns across the whole conversation.
    pub fn total_turns(&self) -> u32 {
        self.messages
            .iter()
            .filter(|m| m.role() == Role::User)
            .count() as u32
    }

    /// Returns the last `n` messages, most recent first.
    pub fn recent_messages(&self, n: usize) -> Vec<&Message> {
        self.messages.iter().rev().take(n).collect()
    }

    /// Moves the session to a new phase, resetting the per-phase turn count.
    ///
    /// Transition legality is the state machine's responsibility; this only
    /// performs the bookkeeping.
    pub fn set_phase(&mut self, phase: ConversationPhase) {
        self.phase = phase;
        self.turns_in_phase = 0;
        self.updated_at = Timestamp::now();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_starts_in_discovery() {
        let session = Session::new();
        assert_eq!(session.phase, ConversationPhase::Discovery);
        assert_eq!(session.turns_in_phase, 0);
        assert!(session.messages.is_empty());
    }

    #[test]
    fn user_messages_count_as_turns() {
        let mut session = Session::new();
        session.add_message(Message::user("hello").unwrap());
        session.add_message(Message::assistant("hi, what's your goal?").unwrap());
        session.add_message(Message::user("grow revenue").unwrap());

        assert_eq!(session.turns_in_phase, 2);
        assert_eq!(session.total_turns(), 2);
    }

    #[test]
    fn set_phase_resets_turn_count() {
        let mut session = Session::new();
        session.add_message(Message::user("hello").unwrap());
        session.set_phase(ConversationPhase::Refinement);

        assert_eq!(session.phase, ConversationPhase::Refinement);
        assert_eq!(session.turns_in_phase, 0);
        // Total turns are unaffected by phase changes
        assert_eq!(session.total_turns(), 1);
    }

    #[test]
    fn recent_messages_are_newest_first() {
        let mut session = Session::new();
        session.add_message(Message::user("first").unwrap());
        session.add_message(Message::user("second").unwrap());
        session.add_message(Message::user("third").unwrap());

        let recent = session.recent_messages(2);
        assert_eq!(recent[0].content(), "third");
        assert_eq!(recent[1].content(), "second");
    }

    mod has_data {
        use super::*;

        #[test]
        fn objective_path_requires_non_blank_text() {
            let mut ctx = SessionContext::default();
            assert!(!ctx.has_data("okr_data.objective"));

            ctx.okr_data.objective = Some("  ".to_string());
            assert!(!ctx.has_data("okr_data.objective"));

            ctx.okr_data.objective = Some("Increase customer retention".to_string());
            assert!(ctx.has_data("okr_data.objective"));
        }

        #[test]
        fn key_results_path_requires_at_least_one_entry() {
            let mut ctx = SessionContext::default();
            assert!(!ctx.has_data("okr_data.key_results"));

            ctx.okr_data.key_results.push("NPS above 50".to_string());
            assert!(ctx.has_data("okr_data.key_results"));
        }

        #[test]
        fn extra_paths_resolve_nested_objects() {
            let mut ctx = SessionContext::default();
            ctx.extra.insert(
                "profile".to_string(),
                serde_json::json!({"team": "growth", "tags": []}),
            );

            assert!(ctx.has_data("profile.team"));
            assert!(!ctx.has_data("profile.tags"));
            assert!(!ctx.has_data("profile.missing"));
            assert!(!ctx.has_data("unknown.path"));
        }
    }
}
