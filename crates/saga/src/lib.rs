//! Join/compensate saga for the marketplace.
//!
//! The saga reconciles the Project and Freelancer aggregates without a
//! distributed transaction:
//! 1. `Project::join` commits the project side optimistically and records a
//!    `FreelancerJoinedProject` ledger entry in the same local transaction.
//! 2. The dispatcher delivers the entry to the freelancer-side listener,
//!    which reduces the weekly availability, or, on a shortfall, records a
//!    `FreelancerProjectCommitmentFailed` compensation atomically with its
//!    own save.
//! 3. The compensation is delivered to the project-side listener, which
//!    removes the commitment.
//!
//! Every listener is idempotent against redelivery of the same entry id;
//! the caller of `join` never sees the shortfall, only the freelancer
//! disappearing from the committed list (documented eventual consistency).

pub mod listeners;

pub use listeners::{FreelancerCommitmentListener, ProjectCompensationListener};

use std::sync::Arc;

use dispatcher::ListenerRegistry;
use domain::{FreelancerRepository, ProjectRepository};

/// Registers both saga listeners into a listener registry.
pub fn register_listeners<FR, PR>(
    registry: &mut ListenerRegistry,
    freelancer_repo: FR,
    project_repo: PR,
) where
    FR: FreelancerRepository + 'static,
    PR: ProjectRepository + 'static,
{
    registry.register(Arc::new(FreelancerCommitmentListener::new(freelancer_repo)));
    registry.register(Arc::new(ProjectCompensationListener::new(project_repo)));
}
