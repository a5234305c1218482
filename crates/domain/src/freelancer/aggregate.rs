//! Freelancer aggregate implementation.

use std::collections::HashSet;

use common::{FreelancerId, ProjectId, Version};
use ledger::EventId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::MarketplaceEvent;

/// Errors produced by freelancer commands.
#[derive(Debug, Error)]
pub enum FreelancerError {
    /// A reduction must commit at least one hour.
    #[error("Reduction hours must be positive, got {hours}")]
    InvalidHours { hours: u32 },

    /// Registration requires a name.
    #[error("Freelancer name is required")]
    NameRequired,

    /// The freelancer is already registered.
    #[error("Freelancer already registered: {0}")]
    AlreadyRegistered(FreelancerId),
}

/// Result of an availability reduction: the resulting aggregate state plus
/// the events it emitted.
///
/// On a shortfall the state is returned unchanged and the single emitted
/// event is the compensation; there is never a partial reduction.
#[derive(Debug, Clone)]
pub struct Reduction {
    /// The aggregate after the reduction attempt.
    pub freelancer: Freelancer,

    /// The events emitted by the attempt.
    pub events: Vec<MarketplaceEvent>,
}

impl Reduction {
    /// Returns true if the reduction succeeded (an assignment was emitted).
    pub fn is_assignment(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, MarketplaceEvent::FreelancerAssigned(_)))
    }
}

/// Freelancer aggregate root.
///
/// Invariant: `weekly_availability` never goes negative. A reduction that
/// would breach it leaves the aggregate unchanged and emits a compensating
/// event instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Freelancer {
    /// Unique freelancer identifier.
    id: FreelancerId,

    /// Display name.
    name: String,

    /// Hours per week still available for new commitments.
    weekly_availability: u32,

    /// Current version for optimistic concurrency.
    #[serde(default)]
    version: Version,

    /// Ledger entry ids already applied to this aggregate. Redelivery of a
    /// recorded id must be a no-op; the set is persisted with the aggregate
    /// so deduplication commits atomically with the state change.
    #[serde(default)]
    applied_events: HashSet<EventId>,
}

impl Freelancer {
    /// Registers a new freelancer.
    pub fn register(
        id: FreelancerId,
        name: impl Into<String>,
        weekly_availability: u32,
    ) -> Result<Self, FreelancerError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(FreelancerError::NameRequired);
        }

        Ok(Self {
            id,
            name,
            weekly_availability,
            version: Version::initial(),
            applied_events: HashSet::new(),
        })
    }

    /// Attempts to reduce the weekly availability for a project commitment.
    ///
    /// Returns the new state and an assignment event when the availability
    /// covers `hours`; otherwise returns the unchanged state and exactly one
    /// compensating event carrying the shortfall. Only `hours == 0` is an
    /// error: a shortfall is a normal saga outcome, not a failure.
    pub fn reduce_weekly_availability(
        &self,
        hours: u32,
        project_id: ProjectId,
    ) -> Result<Reduction, FreelancerError> {
        if hours == 0 {
            return Err(FreelancerError::InvalidHours { hours });
        }

        if self.weekly_availability >= hours {
            let mut reduced = self.clone();
            reduced.weekly_availability -= hours;
            Ok(Reduction {
                freelancer: reduced,
                events: vec![MarketplaceEvent::freelancer_assigned(
                    project_id, self.id, hours,
                )],
            })
        } else {
            Ok(Reduction {
                freelancer: self.clone(),
                events: vec![MarketplaceEvent::commitment_failed(
                    self.id,
                    project_id,
                    hours,
                    self.weekly_availability,
                )],
            })
        }
    }

    /// Returns true if the given ledger entry was already applied.
    pub fn has_applied(&self, event_id: EventId) -> bool {
        self.applied_events.contains(&event_id)
    }

    /// Records a ledger entry as applied (idempotency key).
    pub fn record_applied(&mut self, event_id: EventId) {
        self.applied_events.insert(event_id);
    }
}

// Query methods
impl Freelancer {
    /// Returns the freelancer ID.
    pub fn id(&self) -> FreelancerId {
        self.id
    }

    /// Returns the display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the remaining weekly availability in hours.
    pub fn weekly_availability(&self) -> u32 {
        self.weekly_availability
    }

    /// Returns the current version.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Sets the aggregate version. Called by repositories after a save.
    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn freelancer_with(availability: u32) -> Freelancer {
        Freelancer::register(FreelancerId::new(), "Ada", availability).unwrap()
    }

    #[test]
    fn register_requires_name() {
        let result = Freelancer::register(FreelancerId::new(), "  ", 40);
        assert!(matches!(result, Err(FreelancerError::NameRequired)));
    }

    #[test]
    fn reduce_with_sufficient_availability() {
        let freelancer = freelancer_with(40);
        let project_id = ProjectId::new();

        let reduction = freelancer
            .reduce_weekly_availability(30, project_id)
            .unwrap();

        assert!(reduction.is_assignment());
        assert_eq!(reduction.freelancer.weekly_availability(), 10);
        assert_eq!(reduction.events.len(), 1);
        match &reduction.events[0] {
            MarketplaceEvent::FreelancerAssigned(data) => {
                assert_eq!(data.project_id, project_id);
                assert_eq!(data.freelancer_id, freelancer.id());
                assert_eq!(data.allocated_hours, 30);
            }
            other => panic!("expected FreelancerAssigned, got {other:?}"),
        }
    }

    #[test]
    fn reduce_to_exactly_zero_succeeds() {
        let freelancer = freelancer_with(30);
        let reduction = freelancer
            .reduce_weekly_availability(30, ProjectId::new())
            .unwrap();

        assert!(reduction.is_assignment());
        assert_eq!(reduction.freelancer.weekly_availability(), 0);
    }

    #[test]
    fn shortfall_leaves_state_unchanged_and_compensates() {
        let freelancer = freelancer_with(10);
        let project_id = ProjectId::new();

        let reduction = freelancer
            .reduce_weekly_availability(30, project_id)
            .unwrap();

        assert!(!reduction.is_assignment());
        assert_eq!(reduction.freelancer.weekly_availability(), 10);
        assert_eq!(reduction.events.len(), 1);
        match &reduction.events[0] {
            MarketplaceEvent::FreelancerProjectCommitmentFailed(data) => {
                assert_eq!(data.freelancer_id, freelancer.id());
                assert_eq!(data.project_id, project_id);
                assert_eq!(data.committed_hours, 30);
                assert_eq!(data.available_hours, 10);
            }
            other => panic!("expected FreelancerProjectCommitmentFailed, got {other:?}"),
        }
    }

    #[test]
    fn zero_hours_is_rejected() {
        let freelancer = freelancer_with(40);
        let result = freelancer.reduce_weekly_availability(0, ProjectId::new());
        assert!(matches!(
            result,
            Err(FreelancerError::InvalidHours { hours: 0 })
        ));
    }

    #[test]
    fn availability_never_goes_negative_over_any_sequence() {
        let mut freelancer = freelancer_with(25);
        let mut outcomes = Vec::new();
        for hours in [10, 10, 10, 5, 1] {
            let reduction = freelancer
                .reduce_weekly_availability(hours, ProjectId::new())
                .unwrap();
            outcomes.push(reduction.is_assignment());
            freelancer = reduction.freelancer;
        }

        // 25 -> 15 -> 5, then 10 falls short, 5 lands, then 1 falls short.
        assert_eq!(outcomes, vec![true, true, false, true, false]);
        assert_eq!(freelancer.weekly_availability(), 0);
    }

    #[test]
    fn applied_event_ids_are_tracked() {
        let mut freelancer = freelancer_with(40);
        let event_id = EventId::new();

        assert!(!freelancer.has_applied(event_id));
        freelancer.record_applied(event_id);
        assert!(freelancer.has_applied(event_id));
    }

    #[test]
    fn serialization_preserves_applied_events() {
        let mut freelancer = freelancer_with(40);
        let event_id = EventId::new();
        freelancer.record_applied(event_id);

        let json = serde_json::to_string(&freelancer).unwrap();
        let deserialized: Freelancer = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.id(), freelancer.id());
        assert!(deserialized.has_applied(event_id));
    }
}
