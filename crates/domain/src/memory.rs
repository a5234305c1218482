//! In-memory repository implementations.
//!
//! Back the tests and the default single-process wiring. The map write-lock
//! is held across the state write and the ledger append, so each `save` is
//! atomic with respect to other savers of the same repository. This is the
//! in-memory stand-in for the database transaction the PostgreSQL wiring
//! gets from `PostgresLedger::append_in_tx`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{FreelancerId, ProjectId, Version};
use ledger::{EventLedger, LedgerEntry};
use tokio::sync::RwLock;

use crate::freelancer::Freelancer;
use crate::project::Project;
use crate::repository::{
    FreelancerLookup, FreelancerRepository, ProjectRepository, RepositoryError, Result,
};

/// In-memory freelancer repository.
#[derive(Clone)]
pub struct InMemoryFreelancerRepository {
    freelancers: Arc<RwLock<HashMap<FreelancerId, Freelancer>>>,
    ledger: Arc<dyn EventLedger>,
}

impl InMemoryFreelancerRepository {
    /// Creates a new repository appending produced events to `ledger`.
    pub fn new(ledger: Arc<dyn EventLedger>) -> Self {
        Self {
            freelancers: Arc::new(RwLock::new(HashMap::new())),
            ledger,
        }
    }

    /// Returns the number of stored freelancers.
    pub async fn count(&self) -> usize {
        self.freelancers.read().await.len()
    }
}

#[async_trait]
impl FreelancerRepository for InMemoryFreelancerRepository {
    async fn find_by_id(&self, id: FreelancerId) -> Result<Option<Freelancer>> {
        Ok(self.freelancers.read().await.get(&id).cloned())
    }

    async fn save(
        &self,
        freelancer: Freelancer,
        expected: Version,
        entries: Vec<LedgerEntry>,
    ) -> Result<Freelancer> {
        let mut map = self.freelancers.write().await;

        let actual = map
            .get(&freelancer.id())
            .map(|f| f.version())
            .unwrap_or_else(Version::initial);
        if actual != expected {
            return Err(RepositoryError::VersionConflict { expected, actual });
        }

        // Append before the state write: both fallible steps happen first,
        // so a failure leaves neither the state nor the entries behind.
        if !entries.is_empty() {
            self.ledger.append(entries).await?;
        }

        let mut saved = freelancer;
        saved.set_version(expected.next());
        map.insert(saved.id(), saved.clone());
        Ok(saved)
    }
}

#[async_trait]
impl FreelancerLookup for InMemoryFreelancerRepository {
    async fn exists(&self, id: FreelancerId) -> Result<bool> {
        Ok(self.freelancers.read().await.contains_key(&id))
    }
}

/// In-memory project repository.
#[derive(Clone)]
pub struct InMemoryProjectRepository {
    projects: Arc<RwLock<HashMap<ProjectId, Project>>>,
    ledger: Arc<dyn EventLedger>,
}

impl InMemoryProjectRepository {
    /// Creates a new repository appending produced events to `ledger`.
    pub fn new(ledger: Arc<dyn EventLedger>) -> Self {
        Self {
            projects: Arc::new(RwLock::new(HashMap::new())),
            ledger,
        }
    }

    /// Returns the number of stored projects.
    pub async fn count(&self) -> usize {
        self.projects.read().await.len()
    }
}

#[async_trait]
impl ProjectRepository for InMemoryProjectRepository {
    async fn find_by_id(&self, id: ProjectId) -> Result<Option<Project>> {
        Ok(self.projects.read().await.get(&id).cloned())
    }

    async fn save(
        &self,
        project: Project,
        expected: Version,
        entries: Vec<LedgerEntry>,
    ) -> Result<Project> {
        let mut map = self.projects.write().await;

        let actual = map
            .get(&project.id())
            .map(|p| p.version())
            .unwrap_or_else(Version::initial);
        if actual != expected {
            return Err(RepositoryError::VersionConflict { expected, actual });
        }

        if !entries.is_empty() {
            self.ledger.append(entries).await?;
        }

        let mut saved = project;
        saved.set_version(expected.next());
        map.insert(saved.id(), saved.clone());
        Ok(saved)
    }
}
