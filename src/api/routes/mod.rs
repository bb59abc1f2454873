pub mod auth;
pub mod group;
pub mod health;
pub mod matchup;

use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::auth_middleware;
use crate::api::presenter::Notice;
use crate::api::sse::feed_handler;
use crate::api::AppState;

/// Error body shared by every route
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, code: &str, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.to_string(),
            details: None,
            remaining_ms: None,
            notice: None,
        }),
    )
}

/// Create the main API router
pub fn create_api_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .nest("/auth", auth::create_auth_router(state.clone()))
        .nest("/groups", create_group_router(state.clone()))
        .nest("/matchups", create_matchup_router(state.clone()))
        .route("/health", get(health::health_handler))
        .with_state(state)
}

/// Create group router
fn create_group_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/",
            post(group::create_group).layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .route(
            "/:groupId",
            get(group::get_group).layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .route(
            "/:groupId/members",
            post(group::add_member).layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .route(
            "/:groupId/members/:uid",
            put(group::update_member_role)
                .delete(group::remove_member)
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        )
        .route(
            "/:groupId/matchups",
            get(matchup::list_matchups)
                .post(matchup::add_matchup)
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        )
        // EventSource cannot send headers; the token comes in the query
        .route("/:groupId/feed", get(feed_handler))
        .with_state(state)
}

/// Create matchup router
fn create_matchup_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/:matchupId/score",
            post(matchup::increment_score).layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .route(
            "/:matchupId/reset",
            post(matchup::reset_matchup).layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .route(
            "/:matchupId/delete",
            post(matchup::delete_matchup).layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .with_state(state)
}
