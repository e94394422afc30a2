//! Finalization-signal detection over recent user messages.
//!
//! The detector scans the tail of the conversation for phrases that indicate
//! the user wants to lock in the current draft. Thresholds are tunable policy
//! (see `config::SignalSettings`), not a precise contract; they are logged at
//! construction so operators can see the active values.

use serde::{Deserialize, Serialize};

use crate::domain::session::{Message, Role};

/// Tunable policy for signal detection.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalPolicy {
    /// Phrases that count as explicit approval on their own.
    pub strong_phrases: Vec<String>,

    /// Phrases that only count late in the conversation or in pairs.
    pub weak_phrases: Vec<String>,

    /// Total turns the conversation must exceed before a single weak phrase
    /// counts. Guards against matching early throwaway compliments.
    pub weak_min_turns: u32,

    /// Number of co-occurring weak phrases that count regardless of turns.
    pub weak_min_matches: usize,

    /// How many messages from the tail of the history are scanned.
    pub scan_depth: usize,
}

impl Default for SignalPolicy {
    fn default() -> Self {
        Self {
            strong_phrases: [
                "let's finalize",
                "lets finalize",
                "finalize it",
                "i approve",
                "this is good",
                "i'm happy with this",
            ]
            .map(String::from)
            .to_vec(),
            weak_phrases: ["looks good", "perfect", "great", "sounds good"]
                .map(String::from)
                .to_vec(),
            weak_min_turns: 5,
            weak_min_matches: 2,
            scan_depth: 3,
        }
    }
}

/// How confident the detector is about a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalStrength {
    Strong,
    Weak,
}

/// Result of scanning recent messages for a finalization signal.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalDetection {
    pub detected: bool,
    pub strength: Option<SignalStrength>,

    /// The phrases that matched, for audit trails.
    pub matched: Vec<String>,

    /// 0-1 confidence attached to the user-approval trigger.
    pub confidence: f64,
}

impl SignalDetection {
    fn none() -> Self {
        Self {
            detected: false,
            strength: None,
            matched: Vec::new(),
            confidence: 0.0,
        }
    }
}

/// Scans the last `policy.scan_depth` messages (most recent first) for
/// approval phrases in user messages.
///
/// Strong phrases always count. Weak phrases count only once the
/// conversation has exceeded `weak_min_turns` total turns, or when at least
/// `weak_min_matches` weak phrases co-occur.
pub fn detect_finalization_signal(
    policy: &SignalPolicy,
    recent_messages: &[&Message],
    total_turns: u32,
) -> SignalDetection {
    let mut strong_matches = Vec::new();
    let mut weak_matches = Vec::new();

    for message in recent_messages.iter().take(policy.scan_depth) {
        if message.role() != Role::User {
            continue;
        }
        let text = message.content().to_lowercase();

        for phrase in &policy.strong_phrases {
            if text.contains(phrase.as_str()) {
                strong_matches.push(phrase.clone());
            }
        }
        for phrase in &policy.weak_phrases {
            if text.contains(phrase.as_str()) {
                weak_matches.push(phrase.clone());
            }
        }
    }

    if let Some(phrase) = strong_matches.first() {
        tracing::debug!(phrase = %phrase, "strong finalization signal detected");
        return SignalDetection {
            detected: true,
            strength: Some(SignalStrength::Strong),
            matched: strong_matches,
            confidence: 0.9,
        };
    }

    let weak_allowed =
        total_turns > policy.weak_min_turns || weak_matches.len() >= policy.weak_min_matches;
    if !weak_matches.is_empty() && weak_allowed {
        let confidence = if weak_matches.len() >= policy.weak_min_matches {
            0.7
        } else {
            0.6
        };
        tracing::debug!(
            matches = weak_matches.len(),
            total_turns,
            "weak finalization signal accepted"
        );
        return SignalDetection {
            detected: true,
            strength: Some(SignalStrength::Weak),
            matched: weak_matches,
            confidence,
        };
    }

    SignalDetection::none()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(content: &str) -> Message {
        Message::user(content).unwrap()
    }

    fn detect(messages: &[Message], total_turns: u32) -> SignalDetection {
        let refs: Vec<&Message> = messages.iter().collect();
        detect_finalization_signal(&SignalPolicy::default(), &refs, total_turns)
    }

    #[test]
    fn strong_phrase_counts_regardless_of_turns() {
        let messages = vec![user("ok let's finalize this objective")];
        let signal = detect(&messages, 1);
        assert!(signal.detected);
        assert_eq!(signal.strength, Some(SignalStrength::Strong));
        assert!(signal.confidence >= 0.9);
    }

    #[test]
    fn single_weak_phrase_is_ignored_early() {
        let messages = vec![user("perfect")];
        let signal = detect(&messages, 2);
        assert!(!signal.detected);
    }

    #[test]
    fn single_weak_phrase_counts_after_enough_turns() {
        let messages = vec![user("looks good to me")];
        let signal = detect(&messages, 6);
        assert!(signal.detected);
        assert_eq!(signal.strength, Some(SignalStrength::Weak));
    }

    #[test]
    fn two_weak_phrases_count_even_early() {
        let messages = vec![user("perfect"), user("looks good")];
        let signal = detect(&messages, 2);
        assert!(signal.detected);
        assert_eq!(signal.strength, Some(SignalStrength::Weak));
        assert_eq!(signal.matched.len(), 2);
    }

    #[test]
    fn assistant_messages_are_not_scanned() {
        let messages = vec![Message::assistant("this is good, let's finalize").unwrap()];
        let signal = detect(&messages, 10);
        assert!(!signal.detected);
    }

    #[test]
    fn only_the_scan_depth_tail_is_considered() {
        // Four messages; default depth is 3 and the slice is most recent
        // first, so the last entry falls outside the window.
        let messages = vec![
            user("what about timelines?"),
            user("can we adjust the metric"),
            user("one more question"),
            user("let's finalize"),
        ];
        let signal = detect(&messages, 10);
        assert!(!signal.detected);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let messages = vec![user("I APPROVE")];
        let signal = detect(&messages, 1);
        assert!(signal.detected);
    }
}
