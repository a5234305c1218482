//! Event publication ledger for the marketplace.
//!
//! The ledger is a transactional outbox: events are recorded in the same
//! local transaction as the aggregate mutation that produced them, then
//! delivered asynchronously by the dispatcher. Entries transition
//! `Pending -> Dispatched` on successful delivery or `Pending -> Failed` on
//! listener failure; failed entries stay retryable until their retry budget
//! is exhausted, after which they remain queryable as dead letters.
//! Delivery is at least once; consumers must be idempotent.

pub mod entry;
pub mod error;
pub mod ledger;
pub mod memory;
pub mod postgres;

pub use entry::{DispatchState, EventId, LedgerEntry, LedgerEntryBuilder};
pub use error::{LedgerError, Result};
pub use ledger::{EntryStream, EventLedger, EventLedgerExt};
pub use memory::InMemoryLedger;
pub use postgres::PostgresLedger;
