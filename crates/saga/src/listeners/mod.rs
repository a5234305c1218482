//! Module listeners reacting to saga events.

pub mod freelancer_commitments;
pub mod project_compensations;

pub use freelancer_commitments::FreelancerCommitmentListener;
pub use project_compensations::ProjectCompensationListener;

/// Bounded reload-and-reapply attempts on optimistic version conflicts
/// before handing the entry back to the dispatcher for a backoff retry.
pub(crate) const MAX_SAVE_RETRIES: u32 = 5;
