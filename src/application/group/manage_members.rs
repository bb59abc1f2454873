use std::sync::Arc;

use crate::application::auth::register_user::find_by_email;
use crate::domain::entities::{normalize_email, Group, GROUPS};
use crate::domain::repositories::{
    run_transaction, Document, DocumentStore, Fields, RepositoryError, TxWrite,
};
use crate::domain::value_objects::MemberRole;

/// Add member input
pub struct AddMemberInput {
    pub group_id: String,
    pub user_id: String,
    pub email: String,
    pub role: String,
}

/// Change member role input
pub struct UpdateMemberRoleInput {
    pub group_id: String,
    pub user_id: String,
    pub member_uid: String,
    pub role: String,
}

/// Remove member input
pub struct RemoveMemberInput {
    pub group_id: String,
    pub user_id: String,
    pub member_uid: String,
}

/// Membership change output
pub struct MembershipOutput {
    pub group: Group,
    pub member_uid: String,
}

/// Owner-only membership management
pub struct ManageMembers<S: DocumentStore + ?Sized> {
    store: Arc<S>,
}

impl<S: DocumentStore + ?Sized> ManageMembers<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Add a member by email, or change their role if already present
    pub async fn add(&self, input: AddMemberInput) -> Result<MembershipOutput, MembershipError> {
        let role = parse_role(&input.role)?;
        let email = normalize_email(&input.email);
        if email.is_empty() {
            return Err(MembershipError::Validation("Email is required".into()));
        }

        let user = find_by_email(&*self.store, &email)
            .await?
            .ok_or(MembershipError::UserNotFound)?;

        let member_uid = user.id.clone();
        let group = self
            .change(&input.group_id, &input.user_id, |group| {
                if group.role_of(&member_uid) == Some(MemberRole::Owner)
                    && role != MemberRole::Owner
                    && group.owner_count() == 1
                {
                    return Err(last_owner());
                }
                group.members.insert(member_uid.clone(), role);
                Ok(())
            })
            .await?;

        tracing::info!(
            "{} added {} to group {} as {}",
            input.user_id,
            member_uid,
            group.id,
            role.as_str()
        );

        Ok(MembershipOutput { group, member_uid })
    }

    pub async fn update_role(
        &self,
        input: UpdateMemberRoleInput,
    ) -> Result<MembershipOutput, MembershipError> {
        let role = parse_role(&input.role)?;
        let member_uid = input.member_uid.clone();

        let group = self
            .change(&input.group_id, &input.user_id, |group| {
                let current = group
                    .role_of(&member_uid)
                    .ok_or(MembershipError::UserNotFound)?;
                if current == MemberRole::Owner && role != MemberRole::Owner && group.owner_count() == 1 {
                    return Err(last_owner());
                }
                group.members.insert(member_uid.clone(), role);
                Ok(())
            })
            .await?;

        tracing::info!(
            "{} set role of {} in group {} to {}",
            input.user_id,
            member_uid,
            group.id,
            role.as_str()
        );

        Ok(MembershipOutput { group, member_uid })
    }

    pub async fn remove(&self, input: RemoveMemberInput) -> Result<MembershipOutput, MembershipError> {
        let member_uid = input.member_uid.clone();

        let group = self
            .change(&input.group_id, &input.user_id, |group| {
                let current = group
                    .role_of(&member_uid)
                    .ok_or(MembershipError::UserNotFound)?;
                if current == MemberRole::Owner && group.owner_count() == 1 {
                    return Err(last_owner());
                }
                group.members.remove(&member_uid);
                Ok(())
            })
            .await?;

        tracing::info!(
            "{} removed {} from group {}",
            input.user_id,
            member_uid,
            group.id
        );

        Ok(MembershipOutput { group, member_uid })
    }

    /// Apply `edit` to the group's member map inside a transaction; the
    /// caller's owner role is checked against the fresh document
    async fn change<F>(&self, group_id: &str, caller: &str, mut edit: F) -> Result<Group, MembershipError>
    where
        F: FnMut(&mut Group) -> Result<(), MembershipError>,
    {
        run_transaction(&*self.store, GROUPS, group_id, |document: Option<&Document>, _now| {
            let document = document.ok_or(MembershipError::GroupNotFound)?;
            let mut group = Group::from_document(document)?;

            let can_manage = group
                .role_of(caller)
                .map(|r| r.can_manage_members())
                .unwrap_or(false);
            if !can_manage {
                return Err(MembershipError::NotOwner);
            }

            edit(&mut group)?;

            let mut patch = Fields::new();
            patch.insert(
                "members".to_string(),
                serde_json::to_value(&group.members).map_err(RepositoryError::from)?,
            );
            Ok((TxWrite::Update(patch), group))
        })
        .await
    }
}

fn parse_role(role: &str) -> Result<MemberRole, MembershipError> {
    MemberRole::from_str(role.trim())
        .ok_or_else(|| MembershipError::Validation(format!("Unknown role '{}'", role)))
}

fn last_owner() -> MembershipError {
    MembershipError::Validation("A group needs at least one owner".into())
}

#[derive(Debug, thiserror::Error)]
pub enum MembershipError {
    #[error("Group not found")]
    GroupNotFound,
    #[error("Only the group owner can manage members")]
    NotOwner,
    #[error("User not found")]
    UserNotFound,
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}
