//! Contract events exchanged between the project and freelancer modules.

use common::{FreelancerId, ProjectId};
use ledger::LedgerEntry;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event type tag for [`MarketplaceEvent::FreelancerJoinedProject`].
pub const FREELANCER_JOINED_PROJECT: &str = "FreelancerJoinedProject";

/// Event type tag for [`MarketplaceEvent::FreelancerProjectCommitmentFailed`].
pub const FREELANCER_PROJECT_COMMITMENT_FAILED: &str = "FreelancerProjectCommitmentFailed";

/// Event type tag for [`MarketplaceEvent::FreelancerAssigned`].
pub const FREELANCER_ASSIGNED: &str = "FreelancerAssigned";

/// Events produced by the marketplace aggregates.
///
/// These are the module-boundary contracts; their semantics are the same
/// whether delivered in-process or over a broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum MarketplaceEvent {
    /// A freelancer optimistically joined a project (project side committed).
    FreelancerJoinedProject(FreelancerJoinedProjectData),

    /// The freelancer side could not cover the committed hours; the project
    /// side must remove the commitment.
    FreelancerProjectCommitmentFailed(ProjectCommitmentFailedData),

    /// The freelancer side covered the committed hours (informational).
    FreelancerAssigned(FreelancerAssignedData),
}

/// Data for FreelancerJoinedProject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreelancerJoinedProjectData {
    /// The project that was joined.
    pub project_id: ProjectId,

    /// The freelancer who joined.
    pub freelancer_id: FreelancerId,

    /// Hours the project allocated to the freelancer.
    pub allocated_hours: u32,
}

/// Data for FreelancerProjectCommitmentFailed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectCommitmentFailedData {
    /// The freelancer whose availability fell short.
    pub freelancer_id: FreelancerId,

    /// The project whose commitment must be removed.
    pub project_id: ProjectId,

    /// Hours the join attempted to commit.
    pub committed_hours: u32,

    /// Hours the freelancer actually had available.
    pub available_hours: u32,
}

/// Data for FreelancerAssigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreelancerAssignedData {
    /// The project the freelancer was assigned to.
    pub project_id: ProjectId,

    /// The assigned freelancer.
    pub freelancer_id: FreelancerId,

    /// Hours deducted from the freelancer's weekly availability.
    pub allocated_hours: u32,
}

impl MarketplaceEvent {
    /// Returns the stable event type tag.
    pub fn event_type(&self) -> &'static str {
        match self {
            MarketplaceEvent::FreelancerJoinedProject(_) => FREELANCER_JOINED_PROJECT,
            MarketplaceEvent::FreelancerProjectCommitmentFailed(_) => {
                FREELANCER_PROJECT_COMMITMENT_FAILED
            }
            MarketplaceEvent::FreelancerAssigned(_) => FREELANCER_ASSIGNED,
        }
    }

    /// Returns the aggregate identity whose causal delivery order must be
    /// preserved: the aggregate the consuming listener mutates.
    ///
    /// Join and assignment events are ordered per freelancer; compensation
    /// events are ordered per project. Entries with different owners carry
    /// no ordering guarantee.
    pub fn owner_id(&self) -> Uuid {
        match self {
            MarketplaceEvent::FreelancerJoinedProject(data) => data.freelancer_id.as_uuid(),
            MarketplaceEvent::FreelancerProjectCommitmentFailed(data) => data.project_id.as_uuid(),
            MarketplaceEvent::FreelancerAssigned(data) => data.freelancer_id.as_uuid(),
        }
    }

    /// Builds the ledger entry recording this event.
    pub fn to_ledger_entry(&self) -> Result<LedgerEntry, serde_json::Error> {
        Ok(LedgerEntry::builder()
            .event_type(self.event_type())
            .owner_id(self.owner_id())
            .payload(self)?
            .build())
    }
}

// Convenience constructors
impl MarketplaceEvent {
    /// Creates a FreelancerJoinedProject event.
    pub fn freelancer_joined(
        project_id: ProjectId,
        freelancer_id: FreelancerId,
        allocated_hours: u32,
    ) -> Self {
        MarketplaceEvent::FreelancerJoinedProject(FreelancerJoinedProjectData {
            project_id,
            freelancer_id,
            allocated_hours,
        })
    }

    /// Creates a FreelancerProjectCommitmentFailed event.
    pub fn commitment_failed(
        freelancer_id: FreelancerId,
        project_id: ProjectId,
        committed_hours: u32,
        available_hours: u32,
    ) -> Self {
        MarketplaceEvent::FreelancerProjectCommitmentFailed(ProjectCommitmentFailedData {
            freelancer_id,
            project_id,
            committed_hours,
            available_hours,
        })
    }

    /// Creates a FreelancerAssigned event.
    pub fn freelancer_assigned(
        project_id: ProjectId,
        freelancer_id: FreelancerId,
        allocated_hours: u32,
    ) -> Self {
        MarketplaceEvent::FreelancerAssigned(FreelancerAssignedData {
            project_id,
            freelancer_id,
            allocated_hours,
        })
    }
}
