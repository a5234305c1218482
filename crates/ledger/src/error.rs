use thiserror::Error;

use crate::entry::EventId;

/// Errors that can occur when interacting with the event ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The referenced entry does not exist.
    #[error("Ledger entry not found: {0}")]
    EntryNotFound(EventId),

    /// The entries being appended are invalid.
    #[error("Append validation error: {0}")]
    Validation(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
