//! Core domain layer. No external I/O dependencies.
//!
//! Entities and business rules live here. Dependencies flow inward.

pub mod entities;
pub mod errors;
pub mod join_code;

pub use entities::{
    DEFAULT_GROUP_KIND, Group, GroupId, NewGroup, SUGGESTED_GROUP_KINDS, validate_name,
};
pub use errors::DomainError;
pub use join_code::{CODE_ALPHABET, CODE_LENGTH, JoinCode};
