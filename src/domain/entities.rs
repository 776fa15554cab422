//! Domain entities. Pure data structures for the core business.
//!
//! No storage/IO types here; adapters map their records into these.

use crate::domain::{DomainError, JoinCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Group type used when the creator leaves the type blank.
pub const DEFAULT_GROUP_KIND: &str = "Club";

/// Types offered when creating a group. The set is open; any non-blank label is accepted.
pub const SUGGESTED_GROUP_KINDS: &[&str] = &["Club", "Team", "Community", "Work"];

/// Opaque group identifier, assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub String);

impl GroupId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A club, team or community that members join with a code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub code: JoinCode,
    #[serde(rename = "memberCount")]
    pub member_count: u64,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Group {
    /// Build a freshly created group: the creator is the first member.
    pub fn from_new(id: GroupId, draft: NewGroup, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: draft.name,
            kind: draft.kind,
            code: draft.code,
            member_count: 1,
            created_at,
        }
    }

    /// `"Eagles (AB12CD)"`
    pub fn display_label(&self) -> String {
        format!("{} ({})", self.name, self.code)
    }

    /// Link that opens this group; shared as text or QR.
    pub fn share_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.id)
    }
}

/// Validated draft handed to the store's `create`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGroup {
    pub name: String,
    pub kind: String,
    pub code: JoinCode,
}

impl NewGroup {
    /// Trims inputs, rejects a blank name and defaults a blank type.
    pub fn new(name: &str, kind: &str, code: JoinCode) -> Result<Self, DomainError> {
        Ok(Self {
            name: validate_name(name)?,
            kind: normalize_kind(kind),
            code,
        })
    }
}

/// Trimmed, non-empty group name.
pub fn validate_name(name: &str) -> Result<String, DomainError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::Validation(
            "group name must not be empty".into(),
        ));
    }
    Ok(trimmed.to_string())
}

fn normalize_kind(kind: &str) -> String {
    let trimmed = kind.trim();
    if trimmed.is_empty() {
        DEFAULT_GROUP_KIND.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Group {
        let draft = NewGroup::new("Eagles", "Team", JoinCode::parse("AB12CD").unwrap()).unwrap();
        Group::from_new(GroupId("g1".into()), draft, Utc::now())
    }

    #[test]
    fn test_new_group_starts_with_one_member() {
        let g = sample();
        assert_eq!(g.member_count, 1);
        assert_eq!(g.kind, "Team");
    }

    #[test]
    fn test_new_group_rejects_blank_name() {
        let code = JoinCode::parse("AB12CD").unwrap();
        assert!(matches!(
            NewGroup::new("   ", "Club", code),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn test_blank_kind_defaults_to_club() {
        let draft = NewGroup::new(" Owls ", "", JoinCode::parse("QWERTY").unwrap()).unwrap();
        assert_eq!(draft.name, "Owls");
        assert_eq!(draft.kind, DEFAULT_GROUP_KIND);
    }

    #[test]
    fn test_display_label_and_share_url() {
        let g = sample();
        assert_eq!(g.display_label(), "Eagles (AB12CD)");
        assert_eq!(
            g.share_url("https://example.com/club/"),
            "https://example.com/club/g1"
        );
    }

    #[test]
    fn test_serialized_field_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["type"], "Team");
        assert_eq!(json["memberCount"], 1);
        assert_eq!(json["code"], "AB12CD");
        assert!(json.get("createdAt").is_some());
    }
}
