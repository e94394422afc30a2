//! Transition auditing - events, the bus, and derived statistics.

mod bus;
mod event;

pub use bus::{
    EventSweepStats, SubscriptionId, TransitionEventBus, TransitionRecord, TransitionStatistics,
    DEFAULT_MAX_HISTORY, DEFAULT_RETENTION_SECS,
};
pub use event::{TransitionEvent, TransitionEventType};
