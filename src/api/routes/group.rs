use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::Claims;
use crate::api::routes::{api_error, ApiError};
use crate::api::AppState;
use crate::application::group::{
    AddMemberInput, CreateGroup, CreateGroupError, CreateGroupInput, GetGroupDetails,
    GetGroupDetailsError, GetGroupDetailsInput, ManageMembers, MembershipError, MembershipOutput,
    RemoveMemberInput, UpdateMemberRoleInput,
};
use crate::domain::entities::Group;

// ============================================================================
// Request/Response DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    pub modes: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub email: String,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupResponse {
    pub id: String,
    pub name: String,
    pub owner_uid: String,
    pub modes: Vec<String>,
    pub created_at: String,
}

impl From<&Group> for GroupResponse {
    fn from(group: &Group) -> Self {
        Self {
            id: group.id.clone(),
            name: group.name.clone(),
            owner_uid: group.owner_uid.clone(),
            modes: group.modes.clone(),
            created_at: chrono::DateTime::from_timestamp_millis(group.created_at)
                .map(|dt| dt.to_rfc3339())
                .unwrap_or_else(|| "1970-01-01T00:00:00Z".to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberResponse {
    pub uid: String,
    pub display_name: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct CreateGroupResponse {
    pub success: bool,
    pub group: GroupResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDetailsResponse {
    pub success: bool,
    pub group: GroupResponse,
    pub members: Vec<MemberResponse>,
    pub role: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipResponse {
    pub success: bool,
    pub group_id: String,
    pub member_uid: String,
    pub role: Option<String>,
}

impl From<MembershipOutput> for MembershipResponse {
    fn from(output: MembershipOutput) -> Self {
        Self {
            success: true,
            role: output
                .group
                .role_of(&output.member_uid)
                .map(|r| r.as_str().to_string()),
            group_id: output.group.id,
            member_uid: output.member_uid,
        }
    }
}

fn membership_error(e: MembershipError) -> ApiError {
    match e {
        MembershipError::GroupNotFound => {
            api_error(StatusCode::NOT_FOUND, "GROUP_NOT_FOUND", "Group not found")
        }
        MembershipError::NotOwner => api_error(
            StatusCode::FORBIDDEN,
            "FORBIDDEN",
            "Only the group owner can manage members",
        ),
        MembershipError::UserNotFound => {
            api_error(StatusCode::NOT_FOUND, "USER_NOT_FOUND", "User not found")
        }
        MembershipError::Validation(msg) => {
            api_error(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg)
        }
        MembershipError::Repository(e) => {
            tracing::error!("Membership update failed: {}", e);
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "FAILED",
                "Failed to update membership",
            )
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST /api/groups - Create a new group
pub async fn create_group(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<CreateGroupResponse>), ApiError> {
    let use_case = CreateGroup::new(state.store.clone());
    let result = use_case
        .execute(CreateGroupInput {
            owner_id: claims.user_id.clone(),
            name: body.name,
            modes: body.modes.unwrap_or_default(),
        })
        .await
        .map_err(|e| match e {
            CreateGroupError::Validation(msg) => {
                api_error(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg)
            }
            CreateGroupError::UserNotFound => {
                api_error(StatusCode::NOT_FOUND, "USER_NOT_FOUND", "User not found")
            }
            CreateGroupError::Repository(e) => {
                tracing::error!("Create group failed: {}", e);
                api_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CREATE_GROUP_ERROR",
                    "Failed to create group",
                )
            }
        })?;

    Ok((
        StatusCode::CREATED,
        Json(CreateGroupResponse {
            success: true,
            group: GroupResponse::from(&result.group),
        }),
    ))
}

/// GET /api/groups/:groupId - Group with modes and members
pub async fn get_group(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(group_id): Path<String>,
) -> Result<Json<GroupDetailsResponse>, ApiError> {
    let use_case = GetGroupDetails::new(state.store.clone());
    let result = use_case
        .execute(GetGroupDetailsInput {
            group_id,
            user_id: claims.user_id.clone(),
        })
        .await
        .map_err(|e| match e {
            GetGroupDetailsError::GroupNotFound => {
                api_error(StatusCode::NOT_FOUND, "GROUP_NOT_FOUND", "Group not found")
            }
            GetGroupDetailsError::NotMember => api_error(
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Not a member of this group",
            ),
            GetGroupDetailsError::Repository(e) => {
                tracing::error!("Get group failed: {}", e);
                api_error(StatusCode::INTERNAL_SERVER_ERROR, "FAILED", "Failed to load group")
            }
        })?;

    Ok(Json(GroupDetailsResponse {
        success: true,
        group: GroupResponse::from(&result.group),
        members: result
            .members
            .into_iter()
            .map(|m| MemberResponse {
                uid: m.uid,
                display_name: m.display_name,
                email: m.email,
                role: m.role.as_str().to_string(),
            })
            .collect(),
        role: result.role.as_str().to_string(),
    }))
}

/// POST /api/groups/:groupId/members - Add a member by email
pub async fn add_member(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(group_id): Path<String>,
    Json(body): Json<AddMemberRequest>,
) -> Result<Json<MembershipResponse>, ApiError> {
    let output = ManageMembers::new(state.store.clone())
        .add(AddMemberInput {
            group_id,
            user_id: claims.user_id.clone(),
            email: body.email,
            role: body.role.unwrap_or_else(|| "editor".to_string()),
        })
        .await
        .map_err(membership_error)?;

    Ok(Json(output.into()))
}

/// PUT /api/groups/:groupId/members/:uid - Change a member's role
pub async fn update_member_role(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path((group_id, member_uid)): Path<(String, String)>,
    Json(body): Json<UpdateRoleRequest>,
) -> Result<Json<MembershipResponse>, ApiError> {
    let output = ManageMembers::new(state.store.clone())
        .update_role(UpdateMemberRoleInput {
            group_id,
            user_id: claims.user_id.clone(),
            member_uid,
            role: body.role,
        })
        .await
        .map_err(membership_error)?;

    Ok(Json(output.into()))
}

/// DELETE /api/groups/:groupId/members/:uid - Remove a member
pub async fn remove_member(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path((group_id, member_uid)): Path<(String, String)>,
) -> Result<Json<MembershipResponse>, ApiError> {
    let output = ManageMembers::new(state.store.clone())
        .remove(RemoveMemberInput {
            group_id,
            user_id: claims.user_id.clone(),
            member_uid,
        })
        .await
        .map_err(membership_error)?;

    Ok(Json(output.into()))
}
