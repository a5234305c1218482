//! Listener trait for reacting to dispatched ledger entries.

use async_trait::async_trait;
use ledger::LedgerEntry;
use thiserror::Error;

/// Errors a listener can return from [`EventListener::handle`].
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The failure may resolve on its own (missing aggregate, exhausted
    /// optimistic retries, I/O). The dispatcher retries with backoff.
    #[error("Transient listener failure: {0}")]
    Transient(String),

    /// The entry can never be processed (malformed payload, impossible
    /// command). The dispatcher dead-letters it immediately.
    #[error("Fatal listener failure: {0}")]
    Fatal(String),
}

/// Trait for module listeners invoked by the dispatcher.
///
/// Delivery is at least once: `handle` may see the same entry more than
/// once (crash-and-resume, retry after a partial failure) and must be
/// idempotent against repeated delivery of the same `event_id`.
#[async_trait]
pub trait EventListener: Send + Sync {
    /// Returns the listener name, used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Returns the event types this listener consumes.
    fn event_types(&self) -> &'static [&'static str];

    /// Reacts to a single entry: load the target aggregate, mutate, store.
    ///
    /// Completing without error acknowledges the entry for this listener.
    async fn handle(&self, entry: &LedgerEntry) -> Result<(), ListenerError>;
}
