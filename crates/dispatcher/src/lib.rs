//! Event dispatcher for the marketplace.
//!
//! Bridges ledger entries to module listeners on a worker pool separate
//! from command handling. Listeners are registered per event type in a
//! registry resolved at start-up; delivery retries with bounded exponential
//! backoff and dead-letters entries that exhaust their budget.

pub mod dispatcher;
pub mod error;
pub mod listener;
pub mod registry;

pub use dispatcher::{DispatcherConfig, DispatcherHandle, EventDispatcher};
pub use error::DispatchError;
pub use listener::{EventListener, ListenerError};
pub use registry::ListenerRegistry;
