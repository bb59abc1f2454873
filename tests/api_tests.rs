//! API integration tests for the ClashScore backend
//!
//! Drives the axum router end to end against the in-memory store, with a
//! manual clock so cooldown and arm windows can be stepped through.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::{Service, ServiceExt};

use clashscore_backend::api;
use clashscore_backend::domain::services::timing::ManualClock;
use clashscore_backend::infrastructure::app_state::AppState;
use clashscore_backend::infrastructure::config::AppConfig;
use clashscore_backend::infrastructure::database::InMemoryDocumentStore;

const T0: i64 = 1_700_000_000_000;

struct TestApp {
    router: Router,
    clock: Arc<ManualClock>,
}

/// Helper to create a test application
fn create_test_app() -> TestApp {
    let clock = Arc::new(ManualClock::new(T0));
    let store = Arc::new(InMemoryDocumentStore::with_clock(clock.clone()));
    let state = Arc::new(AppState::with_store(
        AppConfig::in_memory("test-secret-key"),
        store,
    ));

    let router = Router::new()
        .nest("/api", api::routes::create_api_router(state.clone()))
        .with_state(state);

    TestApp { router, clock }
}

/// Helper to send a request with an optional JSON body and bearer token
async fn send(
    app: &mut Router,
    method: &str,
    path: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = ServiceExt::<Request<Body>>::ready(app)
        .await
        .unwrap()
        .call(request)
        .await
        .unwrap();

    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

    (status, json)
}

async fn post(app: &mut Router, path: &str, body: Value, token: &str) -> (StatusCode, Value) {
    send(app, "POST", path, Some(body), Some(token)).await
}

async fn get(app: &mut Router, path: &str, token: &str) -> (StatusCode, Value) {
    send(app, "GET", path, None, Some(token)).await
}

/// Register a user, returning (uid, token)
async fn register(app: &mut Router, email: &str, name: &str) -> (String, String) {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/register",
        Some(json!({ "email": email, "password": "password123", "displayName": name })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
    (
        body["user"]["id"].as_str().unwrap().to_string(),
        body["token"].as_str().unwrap().to_string(),
    )
}

struct Crew {
    owner: (String, String),
    friend: (String, String),
    group_id: String,
}

/// Owner + editor friend in one group
async fn crew(app: &mut Router) -> Crew {
    let owner = register(app, "olive@example.com", "Olive").await;
    let friend = register(app, "finn@example.com", "Finn").await;

    let (status, body) = post(app, "/api/groups", json!({ "name": "Friday Crew" }), &owner.1).await;
    assert_eq!(status, StatusCode::CREATED);
    let group_id = body["group"]["id"].as_str().unwrap().to_string();

    let (status, _) = post(
        app,
        &format!("/api/groups/{}/members", group_id),
        json!({ "email": "FINN@example.com", "role": "editor" }),
        &owner.1,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    Crew {
        owner,
        friend,
        group_id,
    }
}

async fn add_matchup(app: &mut Router, crew: &Crew) -> String {
    let (status, body) = post(
        app,
        &format!("/api/groups/{}/matchups", crew.group_id),
        json!({ "mode": "7x", "playerA": crew.owner.0, "playerB": crew.friend.0 }),
        &crew.friend.1,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "add matchup failed: {}", body);
    body["matchup"]["id"].as_str().unwrap().to_string()
}

// ============================================================================
// Auth Tests
// ============================================================================

#[tokio::test]
async fn test_health() {
    let mut app = create_test_app();
    let (status, body) = send(&mut app.router, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_register_missing_credentials() {
    let mut app = create_test_app();

    let (status, body) = send(&mut app.router, "POST", "/api/auth/register", Some(json!({})), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MISSING_CREDENTIALS");
    assert_eq!(body["error"], "Email and password are required");
}

#[tokio::test]
async fn test_register_and_login() {
    let mut app = create_test_app();
    let (uid, _) = register(&mut app.router, "olive@example.com", "Olive").await;

    let (status, body) = send(
        &mut app.router,
        "POST",
        "/api/auth/register",
        Some(json!({ "email": "Olive@Example.com", "password": "password456" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "EMAIL_EXISTS");

    let (status, body) = send(
        &mut app.router,
        "POST",
        "/api/auth/login",
        Some(json!({ "email": "olive@example.com", "password": "wrong" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_CREDENTIALS");

    let (status, body) = send(
        &mut app.router,
        "POST",
        "/api/auth/login",
        Some(json!({ "email": "olive@example.com", "password": "password123" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], uid.as_str());
    assert_eq!(body["user"]["displayName"], "Olive");
    assert!(body["token"].is_string());
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let mut app = create_test_app();

    let (status, _) = send(
        &mut app.router,
        "POST",
        "/api/groups",
        Some(json!({ "name": "x" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = post(&mut app.router, "/api/matchups/m1/score", json!({ "side": "a" }), "bogus").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let mut app = create_test_app();
    let (_, token) = register(&mut app.router, "olive@example.com", "Olive").await;

    let (_, body) = send(&mut app.router, "GET", "/api/health", None, None).await;
    assert_eq!(body["activeSessions"], 1);

    let (status, body) = send(&mut app.router, "POST", "/api/auth/logout", None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, body) = send(&mut app.router, "GET", "/api/health", None, None).await;
    assert_eq!(body["activeSessions"], 0);
}

// ============================================================================
// Group Tests
// ============================================================================

#[tokio::test]
async fn test_group_details_and_membership() {
    let mut app = create_test_app();
    let crew = crew(&mut app.router).await;

    let (status, body) = get(&mut app.router, &format!("/api/groups/{}", crew.group_id), &crew.friend.1).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "editor");
    assert_eq!(body["group"]["modes"], json!(["7x", "Triple Draft", "Mega Draft"]));
    assert_eq!(body["members"].as_array().unwrap().len(), 2);

    // Editors cannot manage members
    let (status, body) = send(
        &mut app.router,
        "DELETE",
        &format!("/api/groups/{}/members/{}", crew.group_id, crew.owner.0),
        None,
        Some(&crew.friend.1),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, body) = send(
        &mut app.router,
        "PUT",
        &format!("/api/groups/{}/members/{}", crew.group_id, crew.friend.0),
        Some(json!({ "role": "viewer" })),
        Some(&crew.owner.1),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "viewer");

    let outsider = register(&mut app.router, "zed@example.com", "Zed").await;
    let (status, _) = get(&mut app.router, &format!("/api/groups/{}", crew.group_id), &outsider.1).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// ============================================================================
// Matchup Tests
// ============================================================================

#[tokio::test]
async fn test_add_matchup_validation() {
    let mut app = create_test_app();
    let crew = crew(&mut app.router).await;
    let path = format!("/api/groups/{}/matchups", crew.group_id);

    let (status, body) = post(
        &mut app.router,
        &path,
        json!({ "mode": "7x", "playerA": crew.owner.0, "playerB": crew.owner.0 }),
        &crew.owner.1,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_ARGUMENT");

    let (status, _) = post(
        &mut app.router,
        &path,
        json!({ "mode": "Chess", "playerA": crew.owner.0, "playerB": crew.friend.0 }),
        &crew.owner.1,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_score_cooldown() {
    let mut app = create_test_app();
    let crew = crew(&mut app.router).await;
    let id = add_matchup(&mut app.router, &crew).await;
    let score_path = format!("/api/matchups/{}/score", id);

    let (status, body) = post(&mut app.router, &score_path, json!({ "side": "a" }), &crew.owner.1).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matchup"]["scoreA"], 1);
    assert_eq!(body["matchup"]["scoreReady"], false);
    assert_eq!(body["matchup"]["showCooldownOverlay"], true);
    assert_eq!(body["notice"]["message"], "Score added");

    app.clock.advance(60_000);
    let (status, body) = post(&mut app.router, &score_path, json!({ "side": "b" }), &crew.friend.1).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], "COOLDOWN_ACTIVE");
    assert_eq!(body["remainingMs"], 60_000);
    assert_eq!(body["notice"]["message"], "Cooldown — 1m 0s left (anti-tampering)");
    assert_eq!(body["notice"]["title"], "7x");

    app.clock.advance(60_000);
    let (status, body) = post(&mut app.router, &score_path, json!({ "side": "b" }), &crew.friend.1).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matchup"]["scoreA"], 1);
    assert_eq!(body["matchup"]["scoreB"], 1);

    let (status, body) = get(
        &mut app.router,
        &format!("/api/groups/{}/matchups?search=olive", crew.group_id),
        &crew.owner.1,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["matchups"][0]["scoreB"], 1);
    assert_eq!(body["matchups"][0]["badges"]["score"]["label"], "Score: Wait 2m 0s");
}

#[tokio::test]
async fn test_invalid_side() {
    let mut app = create_test_app();
    let crew = crew(&mut app.router).await;
    let id = add_matchup(&mut app.router, &crew).await;

    let (status, body) = post(
        &mut app.router,
        &format!("/api/matchups/{}/score", id),
        json!({ "side": "c" }),
        &crew.owner.1,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_ARGUMENT");
}

#[tokio::test]
async fn test_reset_arm_and_confirm() {
    let mut app = create_test_app();
    let crew = crew(&mut app.router).await;
    let id = add_matchup(&mut app.router, &crew).await;
    let reset_path = format!("/api/matchups/{}/reset", id);

    post(&mut app.router, &format!("/api/matchups/{}/score", id), json!({ "side": "a" }), &crew.owner.1).await;

    let (status, body) = post(&mut app.router, &reset_path, json!({}), &crew.owner.1).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "armed");
    assert_eq!(body["waitMs"], 600_000);
    assert_eq!(body["matchup"]["badges"]["reset"]["label"], "Reset: Armed — Wait 10m 0s");
    assert_eq!(
        body["notice"]["message"],
        "Reset armed — come back in 10 minutes, then tap Reset again to confirm."
    );

    app.clock.advance(599_000);
    let (status, body) = post(&mut app.router, &reset_path, json!({}), &crew.friend.1).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ARM_PENDING");
    assert_eq!(body["remainingMs"], 1_000);
    assert_eq!(body["notice"]["message"], "Reset armed — 1s left before you can confirm.");
    assert_eq!(body["notice"]["title"], "7x");

    app.clock.advance(1_000);
    let (status, body) = post(&mut app.router, &reset_path, json!({}), &crew.friend.1).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "reset");
    assert_eq!(body["matchup"]["scoreA"], 0);
    assert!(body["matchup"]["lastScoreAt"].is_null());
    assert_eq!(body["matchup"]["badges"]["reset"]["label"], "Reset: Tap to arm");
    assert_eq!(body["notice"]["message"], "Reset complete");
}

#[tokio::test]
async fn test_delete_arm_and_confirm() {
    let mut app = create_test_app();
    let crew = crew(&mut app.router).await;
    let id = add_matchup(&mut app.router, &crew).await;
    let delete_path = format!("/api/matchups/{}/delete", id);

    let (status, body) = post(&mut app.router, &delete_path, json!({}), &crew.owner.1).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "armed");

    app.clock.advance(600_000);
    let (status, body) = post(&mut app.router, &delete_path, json!({}), &crew.owner.1).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "deleted");
    assert!(body.get("matchup").is_none());
    assert_eq!(body["notice"]["message"], "Matchup deleted");

    let (status, body) = post(
        &mut app.router,
        &format!("/api/matchups/{}/score", id),
        json!({ "side": "a" }),
        &crew.owner.1,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "MATCHUP_NOT_FOUND");
    assert_eq!(body["notice"]["title"], "Score");

    let (_, body) = get(&mut app.router, &format!("/api/groups/{}/matchups", crew.group_id), &crew.owner.1).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_viewer_cannot_mutate() {
    let mut app = create_test_app();
    let crew = crew(&mut app.router).await;
    let id = add_matchup(&mut app.router, &crew).await;

    send(
        &mut app.router,
        "PUT",
        &format!("/api/groups/{}/members/{}", crew.group_id, crew.friend.0),
        Some(json!({ "role": "viewer" })),
        Some(&crew.owner.1),
    )
    .await;

    let (status, body) = post(
        &mut app.router,
        &format!("/api/matchups/{}/score", id),
        json!({ "side": "a" }),
        &crew.friend.1,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    // Reading is still allowed
    let (status, _) = get(&mut app.router, &format!("/api/groups/{}/matchups", crew.group_id), &crew.friend.1).await;
    assert_eq!(status, StatusCode::OK);
}

// ============================================================================
// Feed Tests
// ============================================================================

#[tokio::test]
async fn test_feed_requires_membership() {
    let mut app = create_test_app();
    let crew = crew(&mut app.router).await;
    let path = format!("/api/groups/{}/feed", crew.group_id);

    let (status, _) = send(&mut app.router, "GET", &path, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let outsider = register(&mut app.router, "zed@example.com", "Zed").await;
    let (status, body) = send(
        &mut app.router,
        "GET",
        &format!("{}?token={}", path, outsider.1),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_feed_streams_initial_snapshot() {
    let mut app = create_test_app();
    let crew = crew(&mut app.router).await;
    let id = add_matchup(&mut app.router, &crew).await;

    let request = Request::builder()
        .method("GET")
        .uri(format!("/api/groups/{}/feed?token={}", crew.group_id, crew.owner.1))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut body = response.into_body();
    let frame = tokio::time::timeout(Duration::from_secs(2), body.frame())
        .await
        .expect("no feed event")
        .expect("stream ended")
        .unwrap();
    let text = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();

    assert!(text.starts_with("event: feed"), "unexpected frame: {}", text);
    assert!(text.contains(&id));
    assert!(text.contains("\"resync\":true"));
}
