//! Freelancer module: aggregate, commands, and service.

pub mod aggregate;
pub mod commands;
pub mod service;

pub use aggregate::{Freelancer, FreelancerError, Reduction};
pub use commands::RegisterFreelancer;
pub use service::FreelancerService;
