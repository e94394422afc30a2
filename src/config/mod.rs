//! Library configuration.
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Values are read with the `OKR_COACH`
//! prefix and `__` (double underscore) separating nested keys, e.g.
//! `OKR_COACH__SNAPSHOTS__MAX_PER_SESSION=50`.
//!
//! Everything has a default; the library works without any environment at
//! all. The signal-detection knobs are deliberately configuration rather
//! than constants: they are tunable policy, and the active values are
//! logged so operators can see what a deployment is running with.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::domain::phase::SignalPolicy;
use crate::domain::snapshot::{SnapshotManager, DEFAULT_MAX_PER_SESSION, DEFAULT_RETENTION_SECS};
use crate::domain::transition::{TransitionEventBus, DEFAULT_MAX_HISTORY};

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Snapshot retention settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SnapshotSettings {
    #[serde(default = "defaults::snapshot_cap")]
    pub max_per_session: usize,

    #[serde(default = "defaults::retention_secs")]
    pub retention_secs: u64,
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        Self {
            max_per_session: defaults::snapshot_cap(),
            retention_secs: defaults::retention_secs(),
        }
    }
}

/// Transition audit history settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventSettings {
    #[serde(default = "defaults::event_cap")]
    pub max_history: usize,

    #[serde(default = "defaults::retention_secs")]
    pub retention_secs: u64,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            max_history: defaults::event_cap(),
            retention_secs: defaults::retention_secs(),
        }
    }
}

/// Background maintenance sweep settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SweeperSettings {
    #[serde(default = "defaults::sweep_interval_secs")]
    pub interval_secs: u64,
}

impl Default for SweeperSettings {
    fn default() -> Self {
        Self {
            interval_secs: defaults::sweep_interval_secs(),
        }
    }
}

/// Finalization-signal detection knobs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SignalSettings {
    /// Total turns required before a single weak approval phrase counts.
    #[serde(default = "defaults::weak_min_turns")]
    pub weak_min_turns: u32,

    /// Co-occurring weak phrases that count regardless of turn count.
    #[serde(default = "defaults::weak_min_matches")]
    pub weak_min_matches: usize,

    /// Messages scanned from the tail of the history.
    #[serde(default = "defaults::scan_depth")]
    pub scan_depth: usize,
}

impl Default for SignalSettings {
    fn default() -> Self {
        Self {
            weak_min_turns: defaults::weak_min_turns(),
            weak_min_matches: defaults::weak_min_matches(),
            scan_depth: defaults::scan_depth(),
        }
    }
}

/// Root settings for the library.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub snapshots: SnapshotSettings,

    #[serde(default)]
    pub events: EventSettings,

    #[serde(default)]
    pub sweeper: SweeperSettings,

    #[serde(default)]
    pub signals: SignalSettings,
}

impl Settings {
    /// Loads settings from environment variables.
    ///
    /// Reads a `.env` file if present, then environment variables with the
    /// `OKR_COACH` prefix and `__` separating nested keys.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let settings: Settings = config::Config::builder()
            .add_source(config::Environment::default().prefix("OKR_COACH").separator("__"))
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Semantic validation beyond deserialization.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.snapshots.max_per_session == 0 {
            return Err(ConfigError::Invalid(
                "snapshots.max_per_session must be at least 1".to_string(),
            ));
        }
        if self.events.max_history == 0 {
            return Err(ConfigError::Invalid(
                "events.max_history must be at least 1".to_string(),
            ));
        }
        if self.sweeper.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "sweeper.interval_secs must be at least 1".to_string(),
            ));
        }
        if self.signals.scan_depth == 0 {
            return Err(ConfigError::Invalid(
                "signals.scan_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Builds a snapshot manager governed by the configured cap and
    /// retention window.
    pub fn snapshot_manager(&self) -> SnapshotManager {
        SnapshotManager::new(self.snapshots.max_per_session, self.snapshots.retention_secs)
    }

    /// Builds an event bus governed by the configured history cap and
    /// retention window.
    pub fn event_bus(&self) -> TransitionEventBus {
        TransitionEventBus::new(self.events.max_history, self.events.retention_secs)
    }

    /// The configured maintenance sweep interval.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweeper.interval_secs)
    }

    /// Builds the signal policy from the configured knobs, logging the
    /// active thresholds for operational tuning.
    pub fn signal_policy(&self) -> SignalPolicy {
        let policy = SignalPolicy {
            weak_min_turns: self.signals.weak_min_turns,
            weak_min_matches: self.signals.weak_min_matches,
            scan_depth: self.signals.scan_depth,
            ..SignalPolicy::default()
        };
        tracing::info!(
            weak_min_turns = policy.weak_min_turns,
            weak_min_matches = policy.weak_min_matches,
            scan_depth = policy.scan_depth,
            "finalization-signal policy active"
        );
        policy
    }
}

mod defaults {
    pub fn snapshot_cap() -> usize {
        super::DEFAULT_MAX_PER_SESSION
    }
    pub fn event_cap() -> usize {
        super::DEFAULT_MAX_HISTORY
    }
    pub fn retention_secs() -> u64 {
        super::DEFAULT_RETENTION_SECS
    }
    pub fn sweep_interval_secs() -> u64 {
        300
    }
    pub fn weak_min_turns() -> u32 {
        5
    }
    pub fn weak_min_matches() -> usize {
        2
    }
    pub fn scan_depth() -> usize {
        3
    }
}
