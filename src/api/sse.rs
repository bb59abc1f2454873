use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use async_broadcast::RecvError;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};

use crate::api::presenter::{refresh_statuses, render_cards, CardStatus, MatchupCard};
use crate::api::routes::{api_error, ApiError};
use crate::domain::entities::{Group, Matchup, GROUPS};
use crate::domain::repositories::DocumentChange;
use crate::infrastructure::app_state::AppState;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(20);
const BADGE_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Deserialize)]
pub struct FeedParams {
    token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FeedPayload<'a> {
    group_id: &'a str,
    resync: bool,
    changes: &'a [DocumentChange],
    matchups: Vec<MatchupCard>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BadgesPayload<'a> {
    group_id: &'a str,
    now: i64,
    statuses: Vec<CardStatus>,
}

fn feed_event(group_id: &str, matchups: &[Matchup], changes: &[DocumentChange], resync: bool, now: i64) -> Event {
    let payload = FeedPayload {
        group_id,
        resync,
        changes,
        matchups: render_cards(matchups, now),
    };
    Event::default()
        .event("feed")
        .data(serde_json::to_string(&payload).unwrap_or_default())
}

fn badges_event(group_id: &str, matchups: &[Matchup], now: i64) -> Event {
    let payload = BadgesPayload {
        group_id,
        now,
        statuses: refresh_statuses(matchups, now),
    };
    Event::default()
        .event("badges")
        .data(serde_json::to_string(&payload).unwrap_or_default())
}

/// GET /api/groups/:groupId/feed?token= - live matchup cards for a group
pub async fn feed_handler(
    State(state): State<Arc<AppState>>,
    Path(group_id): Path<String>,
    Query(params): Query<FeedParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let unauthorized = || api_error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Valid token required");
    let token = params.token.ok_or_else(unauthorized)?;
    let claims = state
        .jwt_service
        .verify(&token)
        .map_err(|_| unauthorized())?;

    // Any member may watch
    let group = match state.store.get(GROUPS, &group_id).await {
        Ok(Some(document)) => Group::from_document(&document).ok(),
        Ok(None) => None,
        Err(e) => {
            tracing::error!("Feed lookup for group {} failed: {}", group_id, e);
            return Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "FAILED", "Failed"));
        }
    };
    let group = group.ok_or_else(|| api_error(StatusCode::NOT_FOUND, "GROUP_NOT_FOUND", "Group not found"))?;
    if !group.is_member(&claims.user_id) {
        return Err(api_error(StatusCode::FORBIDDEN, "FORBIDDEN", "Not a member of this group"));
    }

    let feed = state
        .session_manager
        .switch_group(&*state.store, &claims.user_id, &claims.display_name, &group_id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to open feed for group {}: {}", group_id, e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "FAILED", "Failed to open feed")
        })?;

    let mut updates = feed.updates();
    let store = state.store.clone();
    let user_id = claims.user_id.clone();

    let stream = async_stream::stream! {
        tracing::debug!("Feed stream started for {} on group {}", user_id, group_id);

        yield Ok(feed_event(&group_id, &feed.snapshot(), &[], true, store.now()));

        let mut heartbeat_interval = tokio::time::interval(HEARTBEAT_INTERVAL);
        let mut badge_interval = tokio::time::interval(BADGE_INTERVAL);
        heartbeat_interval.tick().await;
        badge_interval.tick().await;

        loop {
            tokio::select! {
                _ = heartbeat_interval.tick() => {
                    tracing::trace!("SSE heartbeat");
                    yield Ok(Event::default().comment("heartbeat"));
                }
                _ = badge_interval.tick() => {
                    yield Ok(badges_event(&group_id, &feed.snapshot(), store.now()));
                }
                result = updates.recv() => {
                    match result {
                        Ok(update) => {
                            tracing::debug!(
                                "Feed update for group {}: {} matchups, {} changes",
                                group_id,
                                update.matchups.len(),
                                update.changes.len()
                            );
                            yield Ok(feed_event(&group_id, &update.matchups, &update.changes, update.resync, store.now()));
                        }
                        Err(RecvError::Overflowed(skipped)) => {
                            tracing::warn!("Feed stream for {} lagged by {} updates, resyncing", user_id, skipped);
                            yield Ok(feed_event(&group_id, &feed.snapshot(), &[], true, store.now()));
                        }
                        Err(RecvError::Closed) => {
                            tracing::debug!("Feed for group {} closed, ending stream", group_id);
                            break;
                        }
                    }
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
