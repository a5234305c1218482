use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_core::Stream;

use crate::{
    entry::{DispatchState, EventId, LedgerEntry},
    error::{LedgerError, Result},
};

/// A stream of ledger entries in production order, for audit and replay.
pub type EntryStream = Pin<Box<dyn Stream<Item = Result<LedgerEntry>> + Send>>;

/// Core trait for event ledger implementations.
///
/// The ledger records produced events durably and hands them to the
/// dispatcher for asynchronous delivery. All implementations must be
/// thread-safe (Send + Sync). Entries are never deleted: a dispatched entry
/// is the audit trail, a dead-lettered entry is the operator's work queue.
#[async_trait]
pub trait EventLedger: Send + Sync {
    /// Appends entries to the ledger.
    ///
    /// Callers invoke this inside the same local transaction as the owning
    /// aggregate's persistence (see the repository `save` contract); if that
    /// transaction rolls back, no entry is recorded.
    async fn append(&self, entries: Vec<LedgerEntry>) -> Result<()>;

    /// Atomically claims up to `limit` deliverable entries.
    ///
    /// An entry is deliverable when it is `Pending`, or `Failed` with a
    /// retry time at or before `now`. Claims are exclusive: a claimed entry
    /// is invisible to concurrent claimers until it is marked dispatched or
    /// failed. At most one entry per `owner_id` is in flight at a time, and
    /// only the oldest unresolved entry of an owner may be claimed, so
    /// delivery follows production order per owner. Crash-and-resume can
    /// still redeliver a claimed entry; consumers must be idempotent.
    async fn claim_batch(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<LedgerEntry>>;

    /// Marks a claimed entry as successfully dispatched and releases the claim.
    async fn mark_dispatched(&self, event_id: EventId) -> Result<()>;

    /// Records a failed delivery attempt and releases the claim.
    ///
    /// Increments the attempt counter and stores `reason`. With
    /// `retry_at = Some(_)` the entry stays retryable; with `None` it becomes
    /// a dead letter and is no longer claimed automatically.
    async fn mark_failed(
        &self,
        event_id: EventId,
        reason: &str,
        retry_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Retrieves a single entry by ID.
    async fn entry(&self, event_id: EventId) -> Result<Option<LedgerEntry>>;

    /// Retrieves all entries in the given state, in production order.
    async fn entries_in_state(&self, state: DispatchState) -> Result<Vec<LedgerEntry>>;

    /// Returns the number of entries awaiting their first delivery.
    async fn pending_count(&self) -> Result<usize>;

    /// Streams every entry in production order (audit/replay).
    async fn stream_all(&self) -> Result<EntryStream>;
}

/// Extension trait providing convenience methods for event ledgers.
#[async_trait]
pub trait EventLedgerExt: EventLedger {
    /// Appends a single entry.
    async fn append_entry(&self, entry: LedgerEntry) -> Result<()> {
        self.append(vec![entry]).await
    }

    /// Returns the failed entries whose retry budget is exhausted.
    async fn dead_letters(&self) -> Result<Vec<LedgerEntry>> {
        let failed = self.entries_in_state(DispatchState::Failed).await?;
        Ok(failed.into_iter().filter(|e| e.is_dead_letter()).collect())
    }
}

// Blanket implementation for all EventLedger implementations
impl<T: EventLedger + ?Sized> EventLedgerExt for T {}

/// Validates entries before appending.
pub fn validate_entries_for_append(entries: &[LedgerEntry]) -> Result<()> {
    if entries.is_empty() {
        return Err(LedgerError::Validation(
            "Cannot append empty entry list".to_string(),
        ));
    }

    for entry in entries {
        if entry.event_type.is_empty() {
            return Err(LedgerError::Validation(
                "Entry event_type must not be empty".to_string(),
            ));
        }
        if entry.state != DispatchState::Pending {
            return Err(LedgerError::Validation(format!(
                "New entries must be pending, got {}",
                entry.state
            )));
        }
    }

    Ok(())
}
