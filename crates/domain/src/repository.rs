//! Repository and lookup traits consumed by the services and listeners.

use async_trait::async_trait;
use common::{FreelancerId, ProjectId, Version};
use ledger::{LedgerEntry, LedgerError};
use thiserror::Error;

use crate::freelancer::Freelancer;
use crate::project::Project;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The aggregate was modified concurrently. Callers reload and reapply.
    #[error("Version conflict: expected {expected}, found {actual}")]
    VersionConflict { expected: Version, actual: Version },

    /// An error occurred in the event ledger.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// A storage backend error occurred.
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Persistence for the freelancer aggregate.
///
/// `save` is the local transaction boundary of the outbox pattern: a single
/// call performs the optimistic version check, persists the new state, and
/// appends the produced ledger entries, atomically. A rolled-back save
/// leaves no entry behind.
#[async_trait]
pub trait FreelancerRepository: Send + Sync {
    /// Loads a freelancer by ID.
    async fn find_by_id(&self, id: FreelancerId) -> Result<Option<Freelancer>>;

    /// Persists the aggregate under an optimistic version check and appends
    /// `entries` to the ledger in the same local transaction.
    ///
    /// `expected` must match the currently persisted version
    /// (`Version::initial()` for a new aggregate) or the save fails with
    /// [`RepositoryError::VersionConflict`]. Returns the saved aggregate
    /// with its version advanced.
    async fn save(
        &self,
        freelancer: Freelancer,
        expected: Version,
        entries: Vec<LedgerEntry>,
    ) -> Result<Freelancer>;
}

/// Persistence for the project aggregate. Same contract as
/// [`FreelancerRepository`].
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Loads a project by ID.
    async fn find_by_id(&self, id: ProjectId) -> Result<Option<Project>>;

    /// Persists the aggregate under an optimistic version check and appends
    /// `entries` to the ledger in the same local transaction.
    async fn save(
        &self,
        project: Project,
        expected: Version,
        entries: Vec<LedgerEntry>,
    ) -> Result<Project>;
}

/// Synchronous freelancer existence check used before `Project::join`.
///
/// Implemented by the freelancer module's repository in-process; an
/// out-of-process deployment would back this with a service call.
#[async_trait]
pub trait FreelancerLookup: Send + Sync {
    /// Returns true if a freelancer with the given ID is registered.
    async fn exists(&self, id: FreelancerId) -> Result<bool>;
}
