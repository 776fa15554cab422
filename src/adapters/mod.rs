//! Infrastructure adapters. Implement outbound ports.
//!
//! Stores (memory, SQLite, Firestore), code generation, export, terminal UI.
//! Map errors to DomainError.

pub mod codes;
pub mod export;
pub mod firestore;
pub mod persistence;
pub mod ui;
