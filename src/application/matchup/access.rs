use crate::application::matchup::MatchupError;
use crate::domain::entities::{Group, Matchup, GROUPS, MATCHUPS};
use crate::domain::repositories::DocumentStore;
use crate::domain::value_objects::MemberRole;

/// Load a group and the caller's role in it
pub(crate) async fn load_group_role<S: DocumentStore + ?Sized>(
    store: &S,
    group_id: &str,
    user_id: &str,
) -> Result<(Group, MemberRole), MatchupError> {
    let document = store
        .get(GROUPS, group_id)
        .await?
        .ok_or(MatchupError::NotFound("Group"))?;
    let group = Group::from_document(&document)?;
    let role = group.role_of(user_id).ok_or(MatchupError::Unauthorized)?;
    Ok((group, role))
}

/// Load a group, requiring the caller to be an owner or editor
pub(crate) async fn require_editor<S: DocumentStore + ?Sized>(
    store: &S,
    group_id: &str,
    user_id: &str,
) -> Result<Group, MatchupError> {
    let (group, role) = load_group_role(store, group_id, user_id).await?;
    if !role.can_edit_matchups() {
        return Err(MatchupError::Unauthorized);
    }
    Ok(group)
}

pub(crate) async fn load_matchup<S: DocumentStore + ?Sized>(
    store: &S,
    matchup_id: &str,
) -> Result<Matchup, MatchupError> {
    let document = store
        .get(MATCHUPS, matchup_id)
        .await?
        .ok_or(MatchupError::NotFound("Matchup"))?;
    Ok(Matchup::from_document(&document)?)
}
