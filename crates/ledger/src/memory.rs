use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    entry::{DispatchState, EventId, LedgerEntry},
    error::{LedgerError, Result},
    ledger::{EntryStream, EventLedger, validate_entries_for_append},
};

#[derive(Default)]
struct Inner {
    /// Entries in insertion order, which is production order.
    entries: Vec<LedgerEntry>,
    index: HashMap<EventId, usize>,
    /// Claimed entries awaiting a dispatch/failure mark.
    in_flight: HashSet<EventId>,
}

/// In-memory event ledger.
///
/// Backs the tests and the default single-process wiring, with the same
/// claim semantics as the PostgreSQL implementation: exclusive claims, one
/// in-flight entry per owner, oldest-first per owner.
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryLedger {
    /// Creates a new empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of entries recorded.
    pub async fn entry_count(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    /// Clears all entries.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.entries.clear();
        inner.index.clear();
        inner.in_flight.clear();
    }
}

#[async_trait]
impl EventLedger for InMemoryLedger {
    async fn append(&self, entries: Vec<LedgerEntry>) -> Result<()> {
        validate_entries_for_append(&entries)?;

        let mut inner = self.inner.write().await;
        for entry in entries {
            if inner.index.contains_key(&entry.event_id) {
                return Err(LedgerError::Validation(format!(
                    "Duplicate entry id: {}",
                    entry.event_id
                )));
            }
            let position = inner.entries.len();
            inner.index.insert(entry.event_id, position);
            inner.entries.push(entry);
        }
        Ok(())
    }

    async fn claim_batch(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<LedgerEntry>> {
        let mut inner = self.inner.write().await;

        // Owners with an entry already in flight are busy.
        let mut busy_owners: HashSet<Uuid> = inner
            .in_flight
            .iter()
            .filter_map(|id| inner.index.get(id).map(|&i| inner.entries[i].owner_id))
            .collect();

        let mut claimed = Vec::new();
        let mut claimed_ids = Vec::new();
        for entry in &inner.entries {
            if claimed.len() >= limit {
                break;
            }
            if busy_owners.contains(&entry.owner_id) {
                continue;
            }
            if entry.is_deliverable(now) {
                busy_owners.insert(entry.owner_id);
                claimed_ids.push(entry.event_id);
                claimed.push(entry.clone());
            } else if entry.is_unresolved() {
                // A failed entry still waiting for its backoff window blocks
                // later entries for the same owner.
                busy_owners.insert(entry.owner_id);
            }
        }

        for id in claimed_ids {
            inner.in_flight.insert(id);
        }
        Ok(claimed)
    }

    async fn mark_dispatched(&self, event_id: EventId) -> Result<()> {
        let mut inner = self.inner.write().await;
        let position = *inner
            .index
            .get(&event_id)
            .ok_or(LedgerError::EntryNotFound(event_id))?;
        inner.entries[position].state = DispatchState::Dispatched;
        inner.entries[position].next_attempt_at = None;
        inner.in_flight.remove(&event_id);

        metrics::counter!("ledger_entries_dispatched").increment(1);
        Ok(())
    }

    async fn mark_failed(
        &self,
        event_id: EventId,
        reason: &str,
        retry_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        let position = *inner
            .index
            .get(&event_id)
            .ok_or(LedgerError::EntryNotFound(event_id))?;
        let entry = &mut inner.entries[position];
        entry.state = DispatchState::Failed;
        entry.attempts += 1;
        entry.last_error = Some(reason.to_string());
        entry.next_attempt_at = retry_at;
        inner.in_flight.remove(&event_id);

        if retry_at.is_none() {
            metrics::counter!("ledger_entries_dead_lettered").increment(1);
            tracing::warn!(%event_id, reason, "ledger entry dead-lettered");
        }
        Ok(())
    }

    async fn entry(&self, event_id: EventId) -> Result<Option<LedgerEntry>> {
        let inner = self.inner.read().await;
        Ok(inner
            .index
            .get(&event_id)
            .map(|&i| inner.entries[i].clone()))
    }

    async fn entries_in_state(&self, state: DispatchState) -> Result<Vec<LedgerEntry>> {
        let inner = self.inner.read().await;
        Ok(inner
            .entries
            .iter()
            .filter(|e| e.state == state)
            .cloned()
            .collect())
    }

    async fn pending_count(&self) -> Result<usize> {
        let inner = self.inner.read().await;
        Ok(inner
            .entries
            .iter()
            .filter(|e| e.state == DispatchState::Pending)
            .count())
    }

    async fn stream_all(&self) -> Result<EntryStream> {
        use futures_util::stream;

        let inner = self.inner.read().await;
        let entries = inner.entries.clone();
        let stream = stream::iter(entries.into_iter().map(Ok));
        Ok(Box::pin(stream))
    }
}
