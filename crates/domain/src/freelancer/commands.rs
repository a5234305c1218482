//! Freelancer commands.

use common::FreelancerId;

/// Command to register a new freelancer.
#[derive(Debug, Clone)]
pub struct RegisterFreelancer {
    /// The ID assigned to the new freelancer.
    pub freelancer_id: FreelancerId,

    /// Display name.
    pub name: String,

    /// Initial weekly availability in hours.
    pub weekly_availability: u32,
}

impl RegisterFreelancer {
    /// Creates a registration command with a fresh ID.
    pub fn new(name: impl Into<String>, weekly_availability: u32) -> Self {
        Self {
            freelancer_id: FreelancerId::new(),
            name: name.into(),
            weekly_availability,
        }
    }

    /// Creates a registration command for an existing ID.
    pub fn with_id(
        freelancer_id: FreelancerId,
        name: impl Into<String>,
        weekly_availability: u32,
    ) -> Self {
        Self {
            freelancer_id,
            name: name.into(),
            weekly_availability,
        }
    }
}
