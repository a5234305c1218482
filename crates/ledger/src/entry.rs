use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a ledger entry.
///
/// Doubles as the idempotency key consumers use to deduplicate redelivered
/// entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random event ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an event ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for EventId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<EventId> for Uuid {
    fn from(id: EventId) -> Self {
        id.0
    }
}

/// Delivery state of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchState {
    /// Recorded, awaiting delivery.
    Pending,
    /// Delivered to every registered listener.
    Dispatched,
    /// Delivery failed. Retryable while `next_attempt_at` is set; a failed
    /// entry without a retry time is a dead letter awaiting operator action.
    Failed,
}

impl DispatchState {
    /// Returns the stable string tag used for persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchState::Pending => "pending",
            DispatchState::Dispatched => "dispatched",
            DispatchState::Failed => "failed",
        }
    }

    /// Parses a persisted state tag.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(DispatchState::Pending),
            "dispatched" => Some(DispatchState::Dispatched),
            "failed" => Some(DispatchState::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for DispatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded domain event awaiting (or past) delivery.
///
/// Entries are appended in the same local transaction as the aggregate
/// mutation that produced them and are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique identifier and idempotency key for this entry.
    pub event_id: EventId,

    /// The event type tag (e.g. "FreelancerJoinedProject").
    pub event_type: String,

    /// The aggregate identity whose causal delivery order must be preserved.
    ///
    /// Entries sharing an owner are delivered one at a time, in production
    /// order. Entries with different owners have no relative ordering.
    pub owner_id: Uuid,

    /// The event payload as JSON.
    pub payload: serde_json::Value,

    /// When the entry was produced.
    pub produced_at: DateTime<Utc>,

    /// Current delivery state.
    pub state: DispatchState,

    /// Number of failed delivery attempts so far.
    pub attempts: u32,

    /// Reason for the most recent failure, if any.
    pub last_error: Option<String>,

    /// Earliest time the next delivery attempt may run. `None` on a failed
    /// entry means the retry budget is exhausted (dead letter).
    pub next_attempt_at: Option<DateTime<Utc>>,
}

impl LedgerEntry {
    /// Creates a new ledger entry builder.
    pub fn builder() -> LedgerEntryBuilder {
        LedgerEntryBuilder::default()
    }

    /// Returns true if the entry may be claimed for delivery at `now`.
    pub fn is_deliverable(&self, now: DateTime<Utc>) -> bool {
        match self.state {
            DispatchState::Pending => true,
            DispatchState::Failed => self.next_attempt_at.is_some_and(|at| at <= now),
            DispatchState::Dispatched => false,
        }
    }

    /// Returns true if the entry will eventually be delivered (pending, or
    /// failed with retry budget remaining). Unresolved entries block later
    /// entries for the same owner.
    pub fn is_unresolved(&self) -> bool {
        match self.state {
            DispatchState::Pending => true,
            DispatchState::Failed => self.next_attempt_at.is_some(),
            DispatchState::Dispatched => false,
        }
    }

    /// Returns true if the entry exhausted its retries and awaits an operator.
    pub fn is_dead_letter(&self) -> bool {
        self.state == DispatchState::Failed && self.next_attempt_at.is_none()
    }
}

/// Builder for constructing ledger entries.
#[derive(Debug, Default)]
pub struct LedgerEntryBuilder {
    event_id: Option<EventId>,
    event_type: Option<String>,
    owner_id: Option<Uuid>,
    payload: Option<serde_json::Value>,
    produced_at: Option<DateTime<Utc>>,
}

impl LedgerEntryBuilder {
    /// Sets the event ID. If not set, a new ID will be generated.
    pub fn event_id(mut self, id: EventId) -> Self {
        self.event_id = Some(id);
        self
    }

    /// Sets the event type.
    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    /// Sets the owning aggregate identity.
    pub fn owner_id(mut self, owner_id: Uuid) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    /// Sets the payload from a serializable value.
    pub fn payload<T: serde::Serialize>(
        mut self,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        self.payload = Some(serde_json::to_value(payload)?);
        Ok(self)
    }

    /// Sets the payload from a raw JSON value.
    pub fn payload_raw(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Sets the production timestamp. If not set, the current time is used.
    pub fn produced_at(mut self, produced_at: DateTime<Utc>) -> Self {
        self.produced_at = Some(produced_at);
        self
    }

    /// Builds the ledger entry.
    ///
    /// # Panics
    ///
    /// Panics if required fields (event_type, owner_id, payload) are not set.
    pub fn build(self) -> LedgerEntry {
        LedgerEntry {
            event_id: self.event_id.unwrap_or_default(),
            event_type: self.event_type.expect("event_type is required"),
            owner_id: self.owner_id.expect("owner_id is required"),
            payload: self.payload.expect("payload is required"),
            produced_at: self.produced_at.unwrap_or_else(Utc::now),
            state: DispatchState::Pending,
            attempts: 0,
            last_error: None,
            next_attempt_at: None,
        }
    }

    /// Tries to build the entry, returning None if required fields are missing.
    pub fn try_build(self) -> Option<LedgerEntry> {
        Some(LedgerEntry {
            event_id: self.event_id.unwrap_or_default(),
            event_type: self.event_type?,
            owner_id: self.owner_id?,
            payload: self.payload?,
            produced_at: self.produced_at.unwrap_or_else(Utc::now),
            state: DispatchState::Pending,
            attempts: 0,
            last_error: None,
            next_attempt_at: None,
        })
    }
}
