use std::sync::Arc;

use crate::domain::entities::{Group, User, GROUPS, USERS};
use crate::domain::repositories::{DocumentStore, RepositoryError};
use crate::domain::value_objects::MemberRole;

/// Get group details input
pub struct GetGroupDetailsInput {
    pub group_id: String,
    pub user_id: String,
}

/// Member with profile details, used for player selection
#[derive(Debug, Clone)]
pub struct MemberInfo {
    pub uid: String,
    pub display_name: String,
    pub email: String,
    pub role: MemberRole,
}

/// Get group details output
pub struct GetGroupDetailsOutput {
    pub group: Group,
    pub members: Vec<MemberInfo>,
    pub role: MemberRole,
}

/// Get group details use case
pub struct GetGroupDetails<S: DocumentStore + ?Sized> {
    store: Arc<S>,
}

impl<S: DocumentStore + ?Sized> GetGroupDetails<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn execute(
        &self,
        input: GetGroupDetailsInput,
    ) -> Result<GetGroupDetailsOutput, GetGroupDetailsError> {
        let document = self
            .store
            .get(GROUPS, &input.group_id)
            .await?
            .ok_or(GetGroupDetailsError::GroupNotFound)?;
        let group = Group::from_document(&document)?;

        let role = group
            .role_of(&input.user_id)
            .ok_or(GetGroupDetailsError::NotMember)?;

        let mut members = Vec::with_capacity(group.members.len());
        for (uid, member_role) in &group.members {
            let profile = match self.store.get(USERS, uid).await? {
                Some(document) => Some(User::from_document(&document)?),
                None => None,
            };
            members.push(MemberInfo {
                uid: uid.clone(),
                display_name: profile
                    .as_ref()
                    .map(User::label)
                    .unwrap_or_else(|| uid.clone()),
                email: profile.map(|p| p.email).unwrap_or_default(),
                role: *member_role,
            });
        }
        members.sort_by(|a, b| {
            a.display_name
                .to_lowercase()
                .cmp(&b.display_name.to_lowercase())
                .then_with(|| a.uid.cmp(&b.uid))
        });

        Ok(GetGroupDetailsOutput {
            group,
            members,
            role,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GetGroupDetailsError {
    #[error("Group not found")]
    GroupNotFound,
    #[error("Not a member of this group")]
    NotMember,
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}
