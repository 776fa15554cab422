//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::{DomainError, Group, GroupId, JoinCode, NewGroup};
use futures::Stream;
use std::pin::Pin;

/// Live sequence of full directory snapshots. The first item is the state at subscription time.
/// Dropping the stream cancels the subscription.
pub type GroupStream = Pin<Box<dyn Stream<Item = Vec<Group>> + Send>>;

/// Entity store port. Durable, queryable collection of groups with live updates.
#[async_trait::async_trait]
pub trait GroupStore: Send + Sync {
    /// Persist a new group with `member_count = 1`. The store assigns the id.
    ///
    /// # Errors
    /// `DomainError::Conflict` if another group already holds `draft.code`.
    async fn create(&self, draft: NewGroup) -> Result<Group, DomainError>;

    /// Exact-match lookup by join code.
    async fn find_by_code(&self, code: &JoinCode) -> Result<Option<Group>, DomainError>;

    async fn get(&self, id: &GroupId) -> Result<Option<Group>, DomainError>;

    /// Add one member. Must be a single store-side update so concurrent joins are never lost.
    ///
    /// # Errors
    /// `DomainError::NotFound` if `id` is absent.
    async fn increment_member_count(&self, id: &GroupId) -> Result<Group, DomainError>;

    /// # Errors
    /// `DomainError::NotFound` if `id` is absent.
    async fn rename(&self, id: &GroupId, name: &str) -> Result<Group, DomainError>;

    async fn list(&self) -> Result<Vec<Group>, DomainError>;

    /// Subscribe to directory changes.
    async fn subscribe(&self) -> Result<GroupStream, DomainError>;
}

/// Produces candidate join codes. No uniqueness guarantee; callers check against the store.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> JoinCode;
}
