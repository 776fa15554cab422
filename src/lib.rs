//! club-directory: Clubs, teams and communities joined by short codes, with Hexagonal Architecture.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod shared;
pub mod usecases;
