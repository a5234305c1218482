//! Project aggregate implementation.

use std::collections::{HashMap, HashSet};

use common::{FreelancerId, ProjectId, Version};
use ledger::EventId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::MarketplaceEvent;

/// Errors produced by project commands.
#[derive(Debug, Error)]
pub enum ProjectError {
    /// A commitment must allocate at least one hour.
    #[error("Allocated hours must be positive, got {hours}")]
    InvalidHours { hours: u32 },

    /// The freelancer already has a commitment on this project. Re-joining
    /// is not a supported update.
    #[error("Freelancer {freelancer_id} already joined this project")]
    AlreadyJoined { freelancer_id: FreelancerId },

    /// Registration requires a name.
    #[error("Project name is required")]
    NameRequired,

    /// The project is already registered.
    #[error("Project already registered: {0}")]
    AlreadyRegistered(ProjectId),
}

/// Result of a join: the resulting aggregate state plus the events it
/// emitted.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    /// The aggregate after the join.
    pub project: Project,

    /// The events emitted by the join.
    pub events: Vec<MarketplaceEvent>,
}

/// Project aggregate root.
///
/// Holds the required hours and the hour allocation per committed
/// freelancer. The sum of allocations versus `required_hours` is a
/// convergence target for the saga, not a constraint enforced at join time;
/// capacity is validated asynchronously on the freelancer side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Unique project identifier.
    id: ProjectId,

    /// Display name.
    name: String,

    /// Free-form description.
    description: String,

    /// Total hours the project needs committed.
    required_hours: u32,

    /// Allocated hours per committed freelancer, unique per freelancer.
    commitments: HashMap<FreelancerId, u32>,

    /// Current version for optimistic concurrency.
    #[serde(default)]
    version: Version,

    /// Ledger entry ids already applied to this aggregate (idempotency keys
    /// for the compensation listener).
    #[serde(default)]
    applied_events: HashSet<EventId>,
}

impl Project {
    /// Registers a new project.
    pub fn register(
        id: ProjectId,
        name: impl Into<String>,
        description: impl Into<String>,
        required_hours: u32,
    ) -> Result<Self, ProjectError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ProjectError::NameRequired);
        }

        Ok(Self {
            id,
            name,
            description: description.into(),
            required_hours,
            commitments: HashMap::new(),
            version: Version::initial(),
            applied_events: HashSet::new(),
        })
    }

    /// Appends a commitment for a freelancer.
    ///
    /// Deliberately does not check `required_hours`: the join is optimistic
    /// and capacity is reconciled asynchronously by the freelancer side.
    pub fn join(
        &self,
        freelancer_id: FreelancerId,
        hours: u32,
    ) -> Result<JoinOutcome, ProjectError> {
        if hours == 0 {
            return Err(ProjectError::InvalidHours { hours });
        }
        if self.commitments.contains_key(&freelancer_id) {
            return Err(ProjectError::AlreadyJoined { freelancer_id });
        }

        let mut joined = self.clone();
        joined.commitments.insert(freelancer_id, hours);

        Ok(JoinOutcome {
            project: joined,
            events: vec![MarketplaceEvent::freelancer_joined(
                self.id,
                freelancer_id,
                hours,
            )],
        })
    }

    /// Removes a freelancer's commitment if present; no-op otherwise.
    ///
    /// Idempotent by design: this is the compensation path and may be
    /// re-applied on redelivery.
    pub fn remove(&self, freelancer_id: FreelancerId) -> Project {
        let mut removed = self.clone();
        removed.commitments.remove(&freelancer_id);
        removed
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
impl Project {
    /// Returns the project ID.
    pub fn id(&self) -> ProjectId {
        self.id
    }

    /// Returns the display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the total hours the project needs committed.
    pub fn required_hours(&self) -> u32 {
        self.required_hours
    }

    /// Returns the commitments as (freelancer, allocated hours) pairs.
    pub fn commitments(&self) -> impl Iterator<Item = (FreelancerId, u32)> + '_ {
        self.commitments.iter().map(|(&id, &hours)| (id, hours))
    }

    /// Returns the hours allocated to a freelancer, if committed.
    pub fn commitment_for(&self, freelancer_id: FreelancerId) -> Option<u32> {
        self.commitments.get(&freelancer_id).copied()
    }

    /// Returns true if the freelancer has a commitment.
    pub fn has_commitment(&self, freelancer_id: FreelancerId) -> bool {
        self.commitments.contains_key(&freelancer_id)
    }

    /// Returns the number of committed freelancers.
    pub fn commitment_count(&self) -> usize {
        self.commitments.len()
    }

    /// Returns the sum of all allocated hours.
    pub fn committed_hours(&self) -> u32 {
        self.commitments.values().sum()
    }

    /// Returns true once the committed hours cover the required hours.
    pub fn is_fully_staffed(&self) -> bool {
        self.committed_hours() >= self.required_hours
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
