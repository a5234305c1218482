//! Project module: aggregate, commands, and service.

pub mod aggregate;
pub mod commands;
pub mod service;

pub use aggregate::{JoinOutcome, Project, ProjectError};
pub use commands::{JoinProject, RegisterProject};
pub use service::ProjectService;
