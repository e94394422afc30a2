//! Transition handler port - subscribers to transition events.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::transition::TransitionEvent;

/// Handler invoked by the event bus when a transition event is emitted.
///
/// Handlers run concurrently with each other. A handler error is logged by
/// the bus and never affects sibling handlers or the emitting transition, so
/// handlers should surface failures through their own channels.
#[async_trait]
pub trait TransitionHandler: Send + Sync {
    async fn handle(&self, event: TransitionEvent) -> Result<(), DomainError>;

    /// Name used in log lines when this handler fails.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_handler_is_object_safe() {
        fn _accepts_dyn(_handler: &dyn TransitionHandler) {}
    }
}
