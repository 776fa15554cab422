//! Entity store adapters. Implement GroupStore.
//!
//! In-memory (tests, demos) and SQLite via libsql (local durable store).

pub mod memory_store;
pub mod snapshot_hub;
pub mod sqlite_store;

pub use memory_store::MemoryGroupStore;
pub use snapshot_hub::SnapshotHub;
pub use sqlite_store::SqliteGroupStore;

use crate::domain::GroupId;
use rand::Rng;

/// Length of store-assigned document ids.
pub const DOCUMENT_ID_LENGTH: usize = 20;

/// Random alphanumeric document id.
pub fn new_document_id() -> GroupId {
    let id: String = rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(DOCUMENT_ID_LENGTH)
        .map(char::from)
        .collect();
    GroupId(id)
}
