//! Domain error types.

use common::{FreelancerId, ProjectId};
use thiserror::Error;

use crate::freelancer::FreelancerError;
use crate::project::ProjectError;
use crate::repository::RepositoryError;

/// Errors that can occur during domain operations.
///
/// Validation failures are surfaced synchronously to the caller and never
/// reach the ledger; an availability shortfall is NOT an error (it is the
/// compensating event).
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the freelancer aggregate.
    #[error("Freelancer error: {0}")]
    Freelancer(#[from] FreelancerError),

    /// An error occurred in the project aggregate.
    #[error("Project error: {0}")]
    Project(#[from] ProjectError),

    /// The referenced freelancer is not registered.
    #[error("Unknown freelancer: {0}")]
    UnknownFreelancer(FreelancerId),

    /// The referenced project does not exist.
    #[error("Project not found: {0}")]
    ProjectNotFound(ProjectId),

    /// An error occurred in a repository.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
