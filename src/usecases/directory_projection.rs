//! Consumer-owned local copy of the live directory.
//!
//! `activate` subscribes to the store and spawns a task that replaces the local
//! snapshot on every update; `deactivate` (or drop) cancels the subscription.

use crate::domain::{DomainError, Group};
use crate::ports::GroupStore;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tracing::debug;

pub struct DirectoryProjection {
    groups: Arc<RwLock<Vec<Group>>>,
    revision: watch::Receiver<u64>,
    task: JoinHandle<()>,
}

impl DirectoryProjection {
    /// Subscribe to `store` and start mirroring it. The first snapshot is applied
    /// before this returns, so `snapshot()` is immediately current.
    pub async fn activate(store: Arc<dyn GroupStore>) -> Result<Self, DomainError> {
        let mut stream = store.subscribe().await?;
        let initial = stream.next().await.ok_or_else(|| {
            DomainError::Subscription("subscription ended before first snapshot".into())
        })?;

        let groups = Arc::new(RwLock::new(initial));
        let (tx, revision) = watch::channel(0u64);
        let local = Arc::clone(&groups);
        let task = tokio::spawn(async move {
            while let Some(snapshot) = stream.next().await {
                debug!(count = snapshot.len(), "directory projection updated");
                *local.write().await = snapshot;
                tx.send_modify(|rev| *rev += 1);
            }
            debug!("directory subscription ended");
        });

        Ok(Self {
            groups,
            revision,
            task,
        })
    }

    pub async fn snapshot(&self) -> Vec<Group> {
        self.groups.read().await.clone()
    }

    /// Receiver whose value increments after each applied snapshot.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.revision.clone()
    }

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop mirroring and drop the subscription.
    pub fn deactivate(self) {
        // Drop aborts the task.
    }
}

impl Drop for DirectoryProjection {
    fn drop(&mut self) {
        self.task.abort();
    }
}
