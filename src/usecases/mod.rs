//! Application use cases. Orchestrate domain logic via ports.

pub mod directory_projection;
pub mod membership_service;

pub use directory_projection::DirectoryProjection;
pub use membership_service::{DEFAULT_MAX_CODE_ATTEMPTS, MembershipService};
