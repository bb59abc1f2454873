use serde::{Deserialize, Serialize};

/// Role of a member inside a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Owner,
    Editor,
    Viewer,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Owner => "owner",
            MemberRole::Editor => "editor",
            MemberRole::Viewer => "viewer",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "owner" => Some(MemberRole::Owner),
            "editor" => Some(MemberRole::Editor),
            "viewer" => Some(MemberRole::Viewer),
            _ => None,
        }
    }

    /// Owners and editors may add and mutate matchups
    pub fn can_edit_matchups(&self) -> bool {
        matches!(self, MemberRole::Owner | MemberRole::Editor)
    }

    /// Only owners manage membership
    pub fn can_manage_members(&self) -> bool {
        *self == MemberRole::Owner
    }
}
