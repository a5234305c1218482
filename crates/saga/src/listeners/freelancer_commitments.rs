//! Freelancer-side listener: applies join commitments to availability.

use async_trait::async_trait;
use dispatcher::{EventListener, ListenerError};
use domain::{
    FREELANCER_JOINED_PROJECT, FreelancerRepository, MarketplaceEvent, RepositoryError,
};
use ledger::LedgerEntry;

use super::MAX_SAVE_RETRIES;

/// Consumes `FreelancerJoinedProject` and reduces the freelancer's weekly
/// availability.
///
/// On a shortfall the aggregate stays unchanged and the compensating
/// `FreelancerProjectCommitmentFailed` entry is appended atomically with the
/// save that records the applied event id. Redelivery of an applied entry is
/// a no-op.
pub struct FreelancerCommitmentListener<R: FreelancerRepository> {
    repo: R,
}

impl<R: FreelancerRepository> FreelancerCommitmentListener<R> {
    /// Creates the listener over the freelancer repository.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl<R: FreelancerRepository> EventListener for FreelancerCommitmentListener<R> {
    fn name(&self) -> &'static str {
        "freelancer-commitments"
    }

    fn event_types(&self) -> &'static [&'static str] {
        &[FREELANCER_JOINED_PROJECT]
    }

    #[tracing::instrument(skip(self, entry), fields(event_id = %entry.event_id))]
    async fn handle(&self, entry: &LedgerEntry) -> Result<(), ListenerError> {
        let event: MarketplaceEvent = serde_json::from_value(entry.payload.clone())
            .map_err(|e| ListenerError::Fatal(format!("undecodable payload: {e}")))?;
        let MarketplaceEvent::FreelancerJoinedProject(data) = event else {
            return Err(ListenerError::Fatal(format!(
                "unexpected event type: {}",
                entry.event_type
            )));
        };

        for _ in 0..MAX_SAVE_RETRIES {
            // Registration may lag behind the join: treat not-found as
            // transient and let the dispatcher retry with backoff.
            let freelancer = self
                .repo
                .find_by_id(data.freelancer_id)
                .await
                .map_err(|e| ListenerError::Transient(e.to_string()))?
                .ok_or_else(|| {
                    ListenerError::Transient(format!(
                        "freelancer {} not found",
                        data.freelancer_id
                    ))
                })?;

            if freelancer.has_applied(entry.event_id) {
                tracing::debug!("entry already applied, skipping");
                return Ok(());
            }

            let expected = freelancer.version();
            let reduction = freelancer
                .reduce_weekly_availability(data.allocated_hours, data.project_id)
                .map_err(|e| ListenerError::Fatal(e.to_string()))?;
            let assigned = reduction.is_assignment();

            let entries = reduction
                .events
                .iter()
                .map(|e| e.to_ledger_entry())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| ListenerError::Fatal(e.to_string()))?;

            let mut state = reduction.freelancer;
            state.record_applied(entry.event_id);

            match self.repo.save(state, expected, entries).await {
                Ok(saved) => {
                    if assigned {
                        metrics::counter!("freelancer_assignments_total").increment(1);
                        tracing::info!(
                            freelancer_id = %data.freelancer_id,
                            project_id = %data.project_id,
                            hours = data.allocated_hours,
                            remaining = saved.weekly_availability(),
                            "availability reduced"
                        );
                    } else {
                        metrics::counter!("freelancer_commitment_compensations_total")
                            .increment(1);
                        tracing::info!(
                            freelancer_id = %data.freelancer_id,
                            project_id = %data.project_id,
                            committed = data.allocated_hours,
                            available = saved.weekly_availability(),
                            "availability shortfall, compensation recorded"
                        );
                    }
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
