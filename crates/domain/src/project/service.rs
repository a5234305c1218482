//! Project service providing a simplified API for project operations.

use common::{ProjectId, Version};

use crate::error::DomainError;
use crate::repository::{FreelancerLookup, ProjectRepository};

use super::{JoinProject, Project, ProjectError, RegisterProject};

/// Service for managing projects.
///
/// `join` is the entry point of the join/compensate saga: it commits the
/// project side optimistically and records the join event in the ledger,
/// all in one local transaction. The freelancer side reconciles
/// asynchronously; a later commitment failure manifests as the freelancer
/// disappearing from the committed list.
pub struct ProjectService<R, F>
where
    R: ProjectRepository,
    F: FreelancerLookup,
{
    repo: R,
    freelancers: F,
}

impl<R, F> ProjectService<R, F>
where
    R: ProjectRepository,
    F: FreelancerLookup,
{
    /// Creates a new project service.
    pub fn new(repo: R, freelancers: F) -> Self {
        Self { repo, freelancers }
    }

    /// Registers a new project.
    #[tracing::instrument(skip(self, cmd), fields(project_id = %cmd.project_id))]
    pub async fn register(&self, cmd: RegisterProject) -> Result<Project, DomainError> {
        if self.repo.find_by_id(cmd.project_id).await?.is_some() {
            return Err(ProjectError::AlreadyRegistered(cmd.project_id).into());
        }

        let project = Project::register(
            cmd.project_id,
            cmd.name,
            cmd.description,
            cmd.required_hours,
        )?;
        let saved = self.repo.save(project, Version::initial(), vec![]).await?;

        metrics::counter!("projects_registered_total").increment(1);
        Ok(saved)
    }

    /// Joins a freelancer to a project.
    ///
    /// Validates that the freelancer exists and that the commitment is new,
    /// then persists the commitment and the `FreelancerJoinedProject` ledger
    /// entry in one local transaction. Capacity is NOT checked here; that is
    /// the freelancer side's job, performed asynchronously.
    #[tracing::instrument(
        skip(self),
        fields(project_id = %cmd.project_id, freelancer_id = %cmd.freelancer_id)
    )]
    pub async fn join(&self, cmd: JoinProject) -> Result<Project, DomainError> {
        if !self.freelancers.exists(cmd.freelancer_id).await? {
            return Err(DomainError::UnknownFreelancer(cmd.freelancer_id));
        }

        let project = self
            .repo
            .find_by_id(cmd.project_id)
            .await?
            .ok_or(DomainError::ProjectNotFound(cmd.project_id))?;

        let outcome = project.join(cmd.freelancer_id, cmd.hours)?;
        let entries = outcome
            .events
            .iter()
            .map(|e| e.to_ledger_entry())
            .collect::<Result<Vec<_>, _>>()?;

        let saved = self
            .repo
            .save(outcome.project, project.version(), entries)
            .await?;

        metrics::counter!("project_joins_total").increment(1);
        tracing::info!(hours = cmd.hours, "freelancer joined project");
        Ok(saved)
    }

    /// Loads a project by ID.
    ///
    /// Returns None if the project doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: ProjectId) -> Result<Option<Project>, DomainError> {
        Ok(self.repo.find_by_id(id).await?)
    }
}
