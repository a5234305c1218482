//! Dispatcher error types.

use ledger::LedgerError;
use thiserror::Error;

/// Errors that can occur while driving dispatch.
///
/// Listener failures are NOT dispatch errors; they are recorded on the
/// entry and retried. Only ledger access problems surface here.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// An error occurred in the event ledger.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Result type for dispatcher operations.
pub type Result<T> = std::result::Result<T, DispatchError>;
