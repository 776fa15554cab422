//! Firestore adapter. Implements GroupStore over the Firestore REST API.

pub mod client;
pub mod mapper;

pub use client::{DEFAULT_FIRESTORE_BASE_URL, FirestoreGroupStore, FirestoreSettings};
