use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::Claims;
use crate::api::presenter::{render_card, render_cards, MatchupCard, Notice};
use crate::api::routes::{ApiError, ErrorResponse};
use crate::api::AppState;
use crate::application::matchup::{
    AddMatchup, AddMatchupInput, ArmOrConfirm, ArmOrConfirmInput, ArmOutcome, IncrementScore,
    IncrementScoreInput, ListMatchups, ListMatchupsInput, MatchupError,
};
use crate::domain::entities::{Matchup, MATCHUPS};
use crate::domain::value_objects::ArmedAction;

// ============================================================================
// Request/Response DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListMatchupsQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMatchupRequest {
    pub mode: String,
    pub player_a: String,
    pub player_b: String,
}

#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    pub side: String,
}

#[derive(Debug, Serialize)]
pub struct ListMatchupsResponse {
    pub success: bool,
    pub matchups: Vec<MatchupCard>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct MatchupResponse {
    pub success: bool,
    pub matchup: MatchupCard,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArmResponse {
    pub success: bool,
    pub action: ArmedAction,
    /// "armed", "reset" or "deleted"
    pub outcome: String,
    pub matchup_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matchup: Option<MatchupCard>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_ms: Option<i64>,
    pub notice: Notice,
}

/// Map an engine error to an HTTP error; `title` heads the notice
fn matchup_error(e: MatchupError, title: &str) -> ApiError {
    let notice = Notice::from_error(&e, title);
    let (status, code, remaining_ms) = match &e {
        MatchupError::NotFound(what) => (
            StatusCode::NOT_FOUND,
            format!("{}_NOT_FOUND", what.to_uppercase()),
            None,
        ),
        MatchupError::CooldownActive { remaining_ms } => (
            StatusCode::TOO_MANY_REQUESTS,
            "COOLDOWN_ACTIVE".to_string(),
            Some(*remaining_ms),
        ),
        MatchupError::ArmPending { remaining_ms, .. } => (
            StatusCode::CONFLICT,
            "ARM_PENDING".to_string(),
            Some(*remaining_ms),
        ),
        MatchupError::ConcurrentModification => (
            StatusCode::CONFLICT,
            "CONCURRENT_MODIFICATION".to_string(),
            None,
        ),
        MatchupError::Unauthorized => (StatusCode::FORBIDDEN, "FORBIDDEN".to_string(), None),
        MatchupError::InvalidArgument(_) => {
            (StatusCode::BAD_REQUEST, "INVALID_ARGUMENT".to_string(), None)
        }
        MatchupError::Repository(inner) => {
            tracing::error!("Matchup operation failed: {}", inner);
            (StatusCode::INTERNAL_SERVER_ERROR, "FAILED".to_string(), None)
        }
    };

    if e.is_transient() {
        tracing::debug!("{} refused: {}", title, e);
    }

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
            code,
            details: None,
            remaining_ms,
            notice: Some(notice),
        }),
    )
}

/// Notices are headed by the matchup's mode while it can still be read
async fn notice_title(state: &AppState, matchup_id: &str, fallback: &str) -> String {
    match state.store.get(MATCHUPS, matchup_id).await {
        Ok(Some(document)) => Matchup::from_document(&document)
            .map(|matchup| matchup.mode)
            .unwrap_or_else(|_| fallback.to_string()),
        _ => fallback.to_string(),
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /api/groups/:groupId/matchups - Ordered cards, optionally filtered
pub async fn list_matchups(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(group_id): Path<String>,
    Query(query): Query<ListMatchupsQuery>,
) -> Result<Json<ListMatchupsResponse>, ApiError> {
    let result = ListMatchups::new(state.store.clone())
        .execute(ListMatchupsInput {
            group_id,
            user_id: claims.user_id.clone(),
            search: query.search,
        })
        .await
        .map_err(|e| matchup_error(e, "Matchups"))?;

    Ok(Json(ListMatchupsResponse {
        success: true,
        matchups: render_cards(&result.matchups, state.store.now()),
        total: result.total,
    }))
}

/// POST /api/groups/:groupId/matchups - Create a matchup
pub async fn add_matchup(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(group_id): Path<String>,
    Json(body): Json<AddMatchupRequest>,
) -> Result<(StatusCode, Json<MatchupResponse>), ApiError> {
    let result = AddMatchup::new(state.store.clone())
        .execute(AddMatchupInput {
            group_id,
            user_id: claims.user_id.clone(),
            mode: body.mode,
            player_a: body.player_a,
            player_b: body.player_b,
        })
        .await
        .map_err(|e| matchup_error(e, "New matchup"))?;

    Ok((
        StatusCode::CREATED,
        Json(MatchupResponse {
            success: true,
            matchup: render_card(&result.matchup, state.store.now()),
            notice: None,
        }),
    ))
}

/// POST /api/matchups/:matchupId/score - Add one point to a side
pub async fn increment_score(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(matchup_id): Path<String>,
    Json(body): Json<ScoreRequest>,
) -> Result<Json<MatchupResponse>, ApiError> {
    let result = match IncrementScore::new(state.store.clone())
        .execute(IncrementScoreInput {
            matchup_id: matchup_id.clone(),
            user_id: claims.user_id.clone(),
            side: body.side,
        })
        .await
    {
        Ok(result) => result,
        Err(e) => {
            let title = notice_title(&state, &matchup_id, "Score").await;
            return Err(matchup_error(e, &title));
        }
    };

    Ok(Json(MatchupResponse {
        success: true,
        notice: Some(Notice::score_added(&result.matchup.mode)),
        matchup: render_card(&result.matchup, state.store.now()),
    }))
}

/// POST /api/matchups/:matchupId/reset - Arm or confirm a reset
pub async fn reset_matchup(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(matchup_id): Path<String>,
) -> Result<Json<ArmResponse>, ApiError> {
    arm_or_confirm(&state, &claims, matchup_id, ArmedAction::Reset).await
}

/// POST /api/matchups/:matchupId/delete - Arm or confirm a delete
pub async fn delete_matchup(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(matchup_id): Path<String>,
) -> Result<Json<ArmResponse>, ApiError> {
    arm_or_confirm(&state, &claims, matchup_id, ArmedAction::Delete).await
}

async fn arm_or_confirm(
    state: &AppState,
    claims: &Claims,
    matchup_id: String,
    action: ArmedAction,
) -> Result<Json<ArmResponse>, ApiError> {
    let result = match ArmOrConfirm::new(state.store.clone())
        .execute(ArmOrConfirmInput {
            matchup_id: matchup_id.clone(),
            user_id: claims.user_id.clone(),
            action,
        })
        .await
    {
        Ok(result) => result,
        Err(e) => {
            let title = notice_title(state, &matchup_id, action.label()).await;
            return Err(matchup_error(e, &title));
        }
    };

    let now = state.store.now();
    let (outcome, matchup, wait_ms, mode) = match &result.outcome {
        ArmOutcome::Armed { matchup, wait_ms } => (
            "armed",
            Some(render_card(matchup, now)),
            Some(*wait_ms),
            matchup.mode.clone(),
        ),
        ArmOutcome::ResetExecuted { matchup } => (
            "reset",
            Some(render_card(matchup, now)),
            None,
            matchup.mode.clone(),
        ),
        ArmOutcome::Deleted { mode, .. } => ("deleted", None, None, mode.clone()),
    };

    Ok(Json(ArmResponse {
        success: true,
        action,
        outcome: outcome.to_string(),
        matchup_id,
        matchup,
        wait_ms,
        notice: Notice::arm_outcome(action, &result.outcome, &mode),
    }))
}
