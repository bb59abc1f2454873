use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::repositories::{Document, Fields, RepositoryError};
use crate::domain::value_objects::MemberRole;

/// Collection holding group documents
pub const GROUPS: &str = "groups";

/// Modes offered when a group is created without any
pub const DEFAULT_MODES: [&str; 3] = ["7x", "Triple Draft", "Mega Draft"];

/// Group entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(skip)]
    pub id: String,
    pub name: String,
    pub owner_uid: String,
    #[serde(default)]
    pub modes: Vec<String>,
    pub created_at: i64,
    /// Member uid -> role
    #[serde(default)]
    pub members: BTreeMap<String, MemberRole>,
}

impl Group {
    /// Create a new group owned by `owner_uid`
    pub fn new(name: String, owner_uid: String, modes: Vec<String>, created_at: i64) -> Self {
        let modes: Vec<String> = modes
            .into_iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();
        let modes = if modes.is_empty() {
            DEFAULT_MODES.iter().map(|m| m.to_string()).collect()
        } else {
            modes
        };

        let mut members = BTreeMap::new();
        members.insert(owner_uid.clone(), MemberRole::Owner);

        Self {
            id: String::new(),
            name,
            owner_uid,
            modes,
            created_at,
            members,
        }
    }

    pub fn from_document(document: &Document) -> Result<Self, RepositoryError> {
        let mut group: Group = document.decode()?;
        group.id = document.id.clone();
        if group.modes.is_empty() {
            group.modes = DEFAULT_MODES.iter().map(|m| m.to_string()).collect();
        }
        Ok(group)
    }

    pub fn to_fields(&self) -> Result<Fields, RepositoryError> {
        crate::domain::repositories::to_fields(self)
    }

    pub fn role_of(&self, uid: &str) -> Option<MemberRole> {
        self.members.get(uid).copied()
    }

    pub fn is_member(&self, uid: &str) -> bool {
        self.members.contains_key(uid)
    }

    pub fn has_mode(&self, mode: &str) -> bool {
        self.modes.iter().any(|m| m == mode)
    }

    /// Number of members holding the owner role
    pub fn owner_count(&self) -> usize {
        self.members
            .values()
            .filter(|r| **r == MemberRole::Owner)
            .count()
    }
}
