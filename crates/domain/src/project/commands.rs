//! Project commands.

use common::{FreelancerId, ProjectId};

/// Command to register a new project.
#[derive(Debug, Clone)]
pub struct RegisterProject {
    /// The ID assigned to the new project.
    pub project_id: ProjectId,

    /// Display name.
    pub name: String,

    /// Free-form description.
    pub description: String,

    /// Total hours the project needs committed.
    pub required_hours: u32,
}

impl RegisterProject {
    /// Creates a registration command with a fresh ID.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        required_hours: u32,
    ) -> Self {
        Self {
            project_id: ProjectId::new(),
            name: name.into(),
            description: description.into(),
            required_hours,
        }
    }

    /// Creates a registration command for an existing ID.
    pub fn with_id(
        project_id: ProjectId,
        name: impl Into<String>,
        description: impl Into<String>,
        required_hours: u32,
    ) -> Self {
        Self {
            project_id,
            name: name.into(),
            description: description.into(),
            required_hours,
        }
    }
}

/// Command for a freelancer to join a project.
#[derive(Debug, Clone, Copy)]
pub struct JoinProject {
    /// The project being joined.
    pub project_id: ProjectId,

    /// The joining freelancer.
    pub freelancer_id: FreelancerId,

    /// Hours to allocate.
    pub hours: u32,
}

impl JoinProject {
    /// Creates a join command.
    pub fn new(project_id: ProjectId, freelancer_id: FreelancerId, hours: u32) -> Self {
        Self {
            project_id,
            freelancer_id,
            hours,
        }
    }
}
