//! Project-side listener: undoes commitments the freelancer could not cover.

use async_trait::async_trait;
use dispatcher::{EventListener, ListenerError};
use domain::{
    FREELANCER_PROJECT_COMMITMENT_FAILED, MarketplaceEvent, ProjectRepository, RepositoryError,
};
use ledger::LedgerEntry;

use super::MAX_SAVE_RETRIES;

/// Consumes `FreelancerProjectCommitmentFailed` and removes the commitment
/// from the project.
///
/// Removal is idempotent both at the aggregate level (`Project::remove` is a
/// no-op for absent commitments) and at the delivery level (applied entry
/// ids are recorded with the save).
pub struct ProjectCompensationListener<R: ProjectRepository> {
    repo: R,
}

impl<R: ProjectRepository> ProjectCompensationListener<R> {
    /// Creates the listener over the project repository.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl<R: ProjectRepository> EventListener for ProjectCompensationListener<R> {
    fn name(&self) -> &'static str {
        "project-compensations"
    }

    fn event_types(&self) -> &'static [&'static str] {
        &[FREELANCER_PROJECT_COMMITMENT_FAILED]
    }

    #[tracing::instrument(skip(self, entry), fields(event_id = %entry.event_id))]
    async fn handle(&self, entry: &LedgerEntry) -> Result<(), ListenerError> {
        let event: MarketplaceEvent = serde_json::from_value(entry.payload.clone())
            .map_err(|e| ListenerError::Fatal(format!("undecodable payload: {e}")))?;
        let MarketplaceEvent::FreelancerProjectCommitmentFailed(data) = event else {
            return Err(ListenerError::Fatal(format!(
                "unexpected event type: {}",
                entry.event_type
            )));
        };

        for _ in 0..MAX_SAVE_RETRIES {
            let project = self
                .repo
                .find_by_id(data.project_id)
                .await
                .map_err(|e| ListenerError::Transient(e.to_string()))?
                .ok_or_else(|| {
                    ListenerError::Transient(format!("project {} not found", data.project_id))
                })?;

            if project.has_applied(entry.event_id) {
                tracing::debug!("entry already applied, skipping");
                return Ok(());
            }

            let expected = project.version();
            let mut state = project.remove(data.freelancer_id);
            state.record_applied(entry.event_id);

            match self.repo.save(state, expected, vec![]).await {
                Ok(_) => {
                    metrics::counter!("project_commitments_removed_total").increment(1);
                    tracing::info!(
                        project_id = %data.project_id,
                        freelancer_id = %data.freelancer_id,
                        committed = data.committed_hours,
                        available = data.available_hours,
                        "commitment removed after availability shortfall"
                    );
                    return Ok(());
                }
                // Stale read: reload and reapply.
                Err(RepositoryError::VersionConflict { .. }) => continue,
                Err(e) => return Err(ListenerError::Transient(e.to_string())),
            }
        }

        Err(ListenerError::Transient(
            "exhausted optimistic save retries".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{FreelancerId, ProjectId, Version};
    use domain::{InMemoryProjectRepository, Project};
    use ledger::InMemoryLedger;
    use std::sync::Arc;

    struct Fixture {
        repo: InMemoryProjectRepository,
        listener: ProjectCompensationListener<InMemoryProjectRepository>,
    }

    fn fixture() -> Fixture {
        let ledger = Arc::new(InMemoryLedger::new());
        let repo = InMemoryProjectRepository::new(ledger);
        let listener = ProjectCompensationListener::new(repo.clone());
        Fixture { repo, listener }
    }

    async fn store_project_with_commitment(
        fixture: &Fixture,
        freelancer_id: FreelancerId,
        hours: u32,
    ) -> ProjectId {
        let project = Project::register(ProjectId::new(), "P", "", 100).unwrap();
        let id = project.id();
        let outcome = project.join(freelancer_id, hours).unwrap();
        fixture
            .repo
            .save(outcome.project, Version::initial(), vec![])
            .await
            .unwrap();
        id
    }

    fn compensation_entry(
        freelancer_id: FreelancerId,
        project_id: ProjectId,
        committed: u32,
        available: u32,
    ) -> LedgerEntry {
        MarketplaceEvent::commitment_failed(freelancer_id, project_id, committed, available)
            .to_ledger_entry()
            .unwrap()
    }

    #[tokio::test]
    async fn removes_commitment() {
        let fixture = fixture();
        let freelancer_id = FreelancerId::new();
        let project_id = store_project_with_commitment(&fixture, freelancer_id, 30).await;
        let entry = compensation_entry(freelancer_id, project_id, 30, 10);

        fixture.listener.handle(&entry).await.unwrap();

        let project = fixture.repo.find_by_id(project_id).await.unwrap().unwrap();
        assert!(!project.has_commitment(freelancer_id));
        assert!(project.has_applied(entry.event_id));
    }

    #[tokio::test]
    async fn redelivery_is_a_no_op() {
        let fixture = fixture();
        let freelancer_id = FreelancerId::new();
        let project_id = store_project_with_commitment(&fixture, freelancer_id, 30).await;
        let entry = compensation_entry(freelancer_id, project_id, 30, 10);

        fixture.listener.handle(&entry).await.unwrap();
        let version_after_first = fixture
            .repo
            .find_by_id(project_id)
            .await
            .unwrap()
            .unwrap()
            .version();

        fixture.listener.handle(&entry).await.unwrap();
        let project = fixture.repo.find_by_id(project_id).await.unwrap().unwrap();

        assert_eq!(project.version(), version_after_first);
        assert!(!project.has_commitment(freelancer_id));
    }

    #[tokio::test]
    async fn absent_commitment_is_still_acknowledged() {
        let fixture = fixture();
        let project = Project::register(ProjectId::new(), "P", "", 100).unwrap();
        let project_id = project.id();
        fixture
            .repo
            .save(project, Version::initial(), vec![])
            .await
            .unwrap();

        let entry = compensation_entry(FreelancerId::new(), project_id, 30, 10);
        fixture.listener.handle(&entry).await.unwrap();

        let project = fixture.repo.find_by_id(project_id).await.unwrap().unwrap();
        assert_eq!(project.commitment_count(), 0);
        assert!(project.has_applied(entry.event_id));
    }

    #[tokio::test]
    async fn unknown_project_is_transient() {
        let fixture = fixture();
        let entry = compensation_entry(FreelancerId::new(), ProjectId::new(), 30, 10);

        let result = fixture.listener.handle(&entry).await;
        assert!(matches!(result, Err(ListenerError::Transient(_))));
    }
}
