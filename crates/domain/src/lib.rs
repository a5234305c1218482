//! Domain layer for the marketplace.
//!
//! This crate provides the two aggregates reconciled by the join/compensate
//! saga and everything they need at the module boundary:
//! - Freelancer aggregate with the availability invariant and reduction logic
//! - Project aggregate with required hours and the commitment list
//! - MarketplaceEvent, the contract events exchanged between modules
//! - Repository traits whose `save` couples state persistence with the
//!   ledger append in one local transaction
//! - Services wrapping the aggregates behind command structs

pub mod error;
pub mod event;
pub mod freelancer;
pub mod memory;
pub mod project;
pub mod repository;

pub use error::DomainError;
pub use event::{
    FREELANCER_ASSIGNED, FREELANCER_JOINED_PROJECT, FREELANCER_PROJECT_COMMITMENT_FAILED,
    FreelancerAssignedData, FreelancerJoinedProjectData, MarketplaceEvent,
    ProjectCommitmentFailedData,
};
pub use freelancer::{
    Freelancer, FreelancerError, FreelancerService, Reduction, RegisterFreelancer,
};
pub use memory::{InMemoryFreelancerRepository, InMemoryProjectRepository};
pub use project::{JoinOutcome, JoinProject, Project, ProjectError, ProjectService, RegisterProject};
pub use repository::{FreelancerLookup, FreelancerRepository, ProjectRepository, RepositoryError};
