//! In-memory GroupStore. Indexes by id and by code under one tokio RwLock.
//!
//! Every mutation holds the write lock for its whole check-and-write, so code
//! uniqueness and member-count increments are atomic.

use crate::adapters::persistence::{SnapshotHub, new_document_id};
use crate::domain::{DomainError, Group, GroupId, JoinCode, NewGroup};
use crate::ports::{GroupStore, GroupStream};
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct Directory {
    groups: HashMap<GroupId, Group>,
    by_code: HashMap<JoinCode, GroupId>,
    /// Creation order, used for listing.
    order: Vec<GroupId>,
}

impl Directory {
    fn snapshot(&self) -> Vec<Group> {
        self.order
            .iter()
            .filter_map(|id| self.groups.get(id).cloned())
            .collect()
    }
}

pub struct MemoryGroupStore {
    directory: RwLock<Directory>,
    hub: SnapshotHub,
}

impl MemoryGroupStore {
    pub fn new() -> Self {
        Self {
            directory: RwLock::new(Directory::default()),
            hub: SnapshotHub::new(),
        }
    }

    /// Apply `f` to an existing group under the write lock and broadcast the result.
    async fn update<F>(&self, id: &GroupId, f: F) -> Result<Group, DomainError>
    where
        F: FnOnce(&mut Group),
    {
        let mut dir = self.directory.write().await;
        let group = dir
            .groups
            .get_mut(id)
            .ok_or_else(|| DomainError::NotFound(format!("no group with id {}", id)))?;
        f(group);
        let updated = group.clone();
        self.hub.publish(dir.snapshot());
        Ok(updated)
    }
}

impl Default for MemoryGroupStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl GroupStore for MemoryGroupStore {
    async fn create(&self, draft: NewGroup) -> Result<Group, DomainError> {
        let mut dir = self.directory.write().await;
        if dir.by_code.contains_key(&draft.code) {
            return Err(DomainError::Conflict(format!(
                "join code {} already in use",
                draft.code
            )));
        }
        let mut id = new_document_id();
        while dir.groups.contains_key(&id) {
            id = new_document_id();
        }
        let group = Group::from_new(id.clone(), draft, Utc::now());
        dir.by_code.insert(group.code.clone(), id.clone());
        dir.groups.insert(id.clone(), group.clone());
        dir.order.push(id);
        debug!(group_id = %group.id, code = %group.code, "group stored in memory");
        self.hub.publish(dir.snapshot());
        Ok(group)
    }

    async fn find_by_code(&self, code: &JoinCode) -> Result<Option<Group>, DomainError> {
        let dir = self.directory.read().await;
        Ok(dir
            .by_code
            .get(code)
            .and_then(|id| dir.groups.get(id))
            .cloned())
    }

    async fn get(&self, id: &GroupId) -> Result<Option<Group>, DomainError> {
        Ok(self.directory.read().await.groups.get(id).cloned())
    }

    async fn increment_member_count(&self, id: &GroupId) -> Result<Group, DomainError> {
        self.update(id, |g| g.member_count += 1).await
    }

    async fn rename(&self, id: &GroupId, name: &str) -> Result<Group, DomainError> {
        let name = name.to_string();
        self.update(id, move |g| g.name = name).await
    }

    async fn list(&self) -> Result<Vec<Group>, DomainError> {
        Ok(self.directory.read().await.snapshot())
    }

    async fn subscribe(&self) -> Result<GroupStream, DomainError> {
        // Hold the read lock while registering so no write slips between snapshot and receiver.
        let dir = self.directory.read().await;
        let rx = self.hub.receiver();
        Ok(SnapshotHub::stream_from(rx, dir.snapshot()))
    }
}
