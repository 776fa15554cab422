//! Membership rules: create groups with unique join codes, join by code, rename.
//!
//! - Validates names and codes before touching the store
//! - Retries code generation on collision, up to a bounded number of attempts
//! - Joins go through the store's atomic increment

use crate::domain::{DomainError, Group, GroupId, JoinCode, NewGroup, validate_name};
use crate::ports::{CodeGenerator, GroupStore};
use std::sync::Arc;
use tracing::{info, warn};

/// Default number of codes tried before giving up on `create_group`.
pub const DEFAULT_MAX_CODE_ATTEMPTS: u32 = 10;

/// Membership service. Orchestrates the entity store and the code generator.
pub struct MembershipService {
    store: Arc<dyn GroupStore>,
    codes: Arc<dyn CodeGenerator>,
    max_code_attempts: u32,
    share_base_url: String,
}

impl MembershipService {
    pub fn new(
        store: Arc<dyn GroupStore>,
        codes: Arc<dyn CodeGenerator>,
        max_code_attempts: u32,
        share_base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            codes,
            max_code_attempts: max_code_attempts.max(1),
            share_base_url: share_base_url.into(),
        }
    }

    pub fn store(&self) -> Arc<dyn GroupStore> {
        Arc::clone(&self.store)
    }

    /// Create a group owned by the caller, who is counted as its first member.
    ///
    /// # Errors
    /// - `Validation` if `name` is blank (nothing is persisted)
    /// - `CodeExhaustion` if every generated code was already taken
    pub async fn create_group(&self, name: &str, kind: &str) -> Result<Group, DomainError> {
        let name = validate_name(name)?;

        for attempt in 1..=self.max_code_attempts {
            let code = self.codes.generate();
            let draft = NewGroup::new(&name, kind, code)?;
            match self.store.create(draft).await {
                Ok(group) => {
                    info!(
                        group_id = %group.id,
                        code = %group.code,
                        kind = %group.kind,
                        attempt,
                        "group created"
                    );
                    return Ok(group);
                }
                Err(DomainError::Conflict(reason)) => {
                    warn!(attempt, %reason, "join code collision; regenerating");
                }
                Err(e) => return Err(e),
            }
        }

        Err(DomainError::CodeExhaustion {
            attempts: self.max_code_attempts,
        })
    }

    /// Join the group behind `code` and return it with the updated member count.
    ///
    /// # Errors
    /// - `Validation` if `code` is not 6 characters of `A-Z0-9` (case and surrounding
    ///   whitespace are ignored)
    /// - `NotFound` if no group uses the code; nothing is modified
    pub async fn join_by_code(&self, code: &str) -> Result<Group, DomainError> {
        let group = self.lookup_code(code).await?;
        let joined = self.store.increment_member_count(&group.id).await?;
        info!(
            group_id = %joined.id,
            code = %joined.code,
            member_count = joined.member_count,
            "member joined"
        );
        Ok(joined)
    }

    /// Resolve a code without joining, e.g. to preview the group first.
    pub async fn lookup_code(&self, code: &str) -> Result<Group, DomainError> {
        let code = JoinCode::from_user_input(code)?;
        self.store
            .find_by_code(&code)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("no group for code {}", code)))
    }

    pub async fn rename_group(&self, id: &GroupId, new_name: &str) -> Result<Group, DomainError> {
        let name = validate_name(new_name)?;
        let group = self.store.rename(id, &name).await?;
        info!(group_id = %group.id, name = %group.name, "group renamed");
        Ok(group)
    }

    pub async fn list_groups(&self) -> Result<Vec<Group>, DomainError> {
        self.store.list().await
    }

    /// Link to share for joining `group`.
    pub fn share_link(&self, group: &Group) -> String {
        group.share_url(&self.share_base_url)
    }
}
