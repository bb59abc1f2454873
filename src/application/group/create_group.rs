use std::sync::Arc;

use crate::domain::entities::{Group, GROUPS, USERS};
use crate::domain::repositories::{DocumentStore, RepositoryError};

/// Create group input
pub struct CreateGroupInput {
    pub owner_id: String,
    pub name: String,
    pub modes: Vec<String>,
}

/// Create group output
pub struct CreateGroupOutput {
    pub group: Group,
}

/// Create group use case
pub struct CreateGroup<S: DocumentStore + ?Sized> {
    store: Arc<S>,
}

impl<S: DocumentStore + ?Sized> CreateGroup<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn execute(&self, input: CreateGroupInput) -> Result<CreateGroupOutput, CreateGroupError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(CreateGroupError::Validation("Group name is required".into()));
        }
        if name.chars().count() > 60 {
            return Err(CreateGroupError::Validation(
                "Group name must be at most 60 characters".into(),
            ));
        }

        // Validate user exists
        if self.store.get(USERS, &input.owner_id).await?.is_none() {
            return Err(CreateGroupError::UserNotFound);
        }

        let mut group = Group::new(
            name.to_string(),
            input.owner_id.clone(),
            input.modes,
            self.store.now(),
        );
        group.id = self.store.add(GROUPS, group.to_fields()?).await?;

        tracing::info!(
            "Group {} ({}) created by {} with modes {:?}",
            group.name,
            group.id,
            input.owner_id,
            group.modes
        );

        Ok(CreateGroupOutput { group })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CreateGroupError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("User not found")]
    UserNotFound,
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}
