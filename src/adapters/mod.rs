//! Adapters - concrete implementations of the ports.

mod session;

pub use session::InMemorySessionStore;
