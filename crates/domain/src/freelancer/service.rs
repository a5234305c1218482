//! Freelancer service providing a simplified API for freelancer operations.

use common::{FreelancerId, Version};

use crate::error::DomainError;
use crate::repository::FreelancerRepository;

use super::{Freelancer, FreelancerError, RegisterFreelancer};

/// Service for managing freelancers.
///
/// Registration is the external command that creates the aggregate; all
/// saga-driven mutations go through the freelancer-side listener instead.
pub struct FreelancerService<R: FreelancerRepository> {
    repo: R,
}

impl<R: FreelancerRepository> FreelancerService<R> {
    /// Creates a new freelancer service with the given repository.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers a new freelancer.
    #[tracing::instrument(skip(self, cmd), fields(freelancer_id = %cmd.freelancer_id))]
    pub async fn register(&self, cmd: RegisterFreelancer) -> Result<Freelancer, DomainError> {
        if self.repo.find_by_id(cmd.freelancer_id).await?.is_some() {
            return Err(FreelancerError::AlreadyRegistered(cmd.freelancer_id).into());
        }

        let freelancer =
            Freelancer::register(cmd.freelancer_id, cmd.name, cmd.weekly_availability)?;
        let saved = self
            .repo
            .save(freelancer, Version::initial(), vec![])
            .await?;

        metrics::counter!("freelancers_registered_total").increment(1);
        Ok(saved)
    }

    /// Loads a freelancer by ID.
    ///
    /// Returns None if the freelancer doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: FreelancerId) -> Result<Option<Freelancer>, DomainError> {
        Ok(self.repo.find_by_id(id).await?)
    }
}
