use serde::{Deserialize, Serialize};

use crate::domain::repositories::{Document, Fields, RepositoryError};

/// Collection holding user profiles
pub const USERS: &str = "users";

/// User profile entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(skip)]
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub photo_url: String,
    #[serde(default)]
    pub password_hash: Option<String>,
    pub created_at: i64,
}

impl User {
    pub fn new(
        id: String,
        display_name: String,
        email: String,
        password_hash: String,
        created_at: i64,
    ) -> Self {
        Self {
            id,
            display_name,
            email,
            photo_url: String::new(),
            password_hash: Some(password_hash),
            created_at,
        }
    }

    pub fn from_document(document: &Document) -> Result<Self, RepositoryError> {
        let mut user: User = document.decode()?;
        user.id = document.id.clone();
        Ok(user)
    }

    pub fn to_fields(&self) -> Result<Fields, RepositoryError> {
        crate::domain::repositories::to_fields(self)
    }

    /// Name shown on matchup cards: display name, then email, then uid
    pub fn label(&self) -> String {
        if !self.display_name.trim().is_empty() {
            self.display_name.clone()
        } else if !self.email.trim().is_empty() {
            self.email.clone()
        } else {
            self.id.clone()
        }
    }
}

/// Normalize an email for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_fallbacks() {
        let mut user = User::new("uid-1".into(), "Ana".into(), "ana@x.io".into(), "h".into(), 0);
        assert_eq!(user.label(), "Ana");
        user.display_name.clear();
        assert_eq!(user.label(), "ana@x.io");
        user.email.clear();
        assert_eq!(user.label(), "uid-1");
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ana@X.io "), "ana@x.io");
    }
}
