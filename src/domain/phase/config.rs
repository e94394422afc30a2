//! Static per-phase configuration table.
//!
//! The table is an ordered array rather than a map so that iteration order,
//! serialization, and deep-copy semantics stay well-defined. Lookup is by
//! phase index.

use once_cell::sync::Lazy;

use super::ConversationPhase;

/// Thresholds and requirements governing one phase.
#[derive(Debug, Clone, Copy)]
pub struct PhaseConfig {
    pub phase: ConversationPhase,

    /// Minimum user turns in the phase before a transition is eligible.
    pub min_turns: u32,

    /// Readiness score (0-1) required for a natural, quality-met transition.
    pub quality_threshold: f64,

    /// Minimum data-quality score (0-100) the validator checks on entry.
    pub min_data_quality: f64,

    /// User turns after which a transition is forced. 0 means never.
    pub timeout_turns: u32,

    /// Dot-paths into the session context that must be present to enter
    /// this phase.
    pub required_data: &'static [&'static str],

    pub description: &'static str,
}

/// One config per phase, in phase order.
pub static PHASE_CONFIGS: Lazy<[PhaseConfig; 5]> = Lazy::new(|| {
    [
        PhaseConfig {
            phase: ConversationPhase::Discovery,
            min_turns: 2,
            quality_threshold: 0.70,
            min_data_quality: 60.0,
            timeout_turns: 12,
            required_data: &[],
            description: "Draft a first objective statement with the user",
        },
        PhaseConfig {
            phase: ConversationPhase::Refinement,
            min_turns: 2,
            quality_threshold: 0.75,
            min_data_quality: 70.0,
            timeout_turns: 10,
            required_data: &["okr_data.objective"],
            description: "Sharpen the objective until it clears the quality bar",
        },
        PhaseConfig {
            phase: ConversationPhase::KrDiscovery,
            min_turns: 3,
            quality_threshold: 0.70,
            min_data_quality: 65.0,
            timeout_turns: 14,
            required_data: &["okr_data.objective"],
            description: "Collect 2-4 measurable key results",
        },
        PhaseConfig {
            phase: ConversationPhase::Validation,
            min_turns: 1,
            quality_threshold: 0.80,
            min_data_quality: 75.0,
            timeout_turns: 6,
            required_data: &["okr_data.objective", "okr_data.key_results"],
            description: "Review the complete OKR set with the user",
        },
        PhaseConfig {
            phase: ConversationPhase::Completed,
            min_turns: 0,
            quality_threshold: 1.0,
            min_data_quality: 80.0,
            timeout_turns: 0,
            required_data: &["okr_data.objective", "okr_data.key_results"],
            description: "OKR set finished",
        },
    ]
});

/// Returns the configuration for a phase.
pub fn config_for(phase: ConversationPhase) -> &'static PhaseConfig {
    &PHASE_CONFIGS[phase.index()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_phase_has_a_config() {
        for phase in ConversationPhase::ordered() {
            let config = config_for(phase);
            assert_eq!(config.phase, phase);
            assert!(!config.description.is_empty());
        }
    }

    #[test]
    fn completed_never_times_out() {
        assert_eq!(config_for(ConversationPhase::Completed).timeout_turns, 0);
    }

    #[test]
    fn table_is_in_phase_order() {
        for (i, config) in PHASE_CONFIGS.iter().enumerate() {
            assert_eq!(config.phase.index(), i);
        }
    }

    #[test]
    fn thresholds_are_within_bounds() {
        for config in PHASE_CONFIGS.iter() {
            assert!((0.0..=1.0).contains(&config.quality_threshold));
            assert!((0.0..=100.0).contains(&config.min_data_quality));
        }
    }

    #[test]
    fn later_phases_require_accumulated_data() {
        assert!(config_for(ConversationPhase::Discovery).required_data.is_empty());
        assert!(config_for(ConversationPhase::Validation)
            .required_data
            .contains(&"okr_data.key_results"));
        assert!(config_for(ConversationPhase::Completed)
            .required_data
            .contains(&"okr_data.objective"));
    }
}
