use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use base64::Engine;
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

use liftlog::api::AppState;
use liftlog::auth::hash_password;
use liftlog::config::Config;
use liftlog::db::{Account, NewAccount};

async fn spawn_app() -> (Router, Arc<AppState>) {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.general.max_db_connections = 1;
    config.general.min_db_connections = 1;
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;

    let state = liftlog::api::create_app_state_from_config(config)
        .await
        .expect("Failed to create app state");

    (liftlog::api::router(state.clone()), state)
}

async fn seed_account(
    state: &Arc<AppState>,
    username: &str,
    password: &str,
    superuser: bool,
) -> Account {
    let record = hash_password(password, state.security()).expect("Failed to hash password");
    state
        .store()
        .create_account(NewAccount {
            username: username.to_string(),
            password: record,
            enabled: true,
            superuser,
        })
        .await
        .expect("Failed to seed account")
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let encoded =
        base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/authenticate")
                .header(header::AUTHORIZATION, format!("Basic {encoded}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    response
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("token token="))
        .expect("no session token in response")
        .to_string()
}

async fn request_json(
    app: &Router,
    method: &str,
    uri: &str,
    token: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("token token={token}"));
    if body.is_some() {
        builder = builder.header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref());
    }
    let request = match body {
        Some(json) => builder
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn entries_are_stamped_with_the_acting_account() {
    let (app, state) = spawn_app().await;
    let alice = seed_account(&state, "alice", "Secret123!", false).await;
    let token = login(&app, "alice", "Secret123!").await;

    let (status, body) = request_json(
        &app,
        "POST",
        "/bodyweight/",
        &token,
        Some(serde_json::json!({"weight": 82.5, "comment": "morning"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], alice.id);
    assert_eq!(body["weight"], 82.5);
    assert_eq!(body["comment"], "morning");

    let (status, listing) = request_json(&app, "GET", "/bodyweight/", &token, None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = listing.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["user_id"], alice.id);
}

#[tokio::test]
async fn cannot_plant_records_on_another_account() {
    let (app, state) = spawn_app().await;
    seed_account(&state, "alice", "Secret123!", false).await;
    let bob = seed_account(&state, "bob", "Hunter2!!", false).await;
    let alice_token = login(&app, "alice", "Secret123!").await;

    let (status, _) = request_json(
        &app,
        "POST",
        "/bodyweight/",
        &alice_token,
        Some(serde_json::json!({"user_id": bob.id, "weight": 90.0})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn superuser_can_record_for_another_account() {
    let (app, state) = spawn_app().await;
    let alice = seed_account(&state, "alice", "Secret123!", false).await;
    seed_account(&state, "root", "RootPW!123", true).await;
    let root_token = login(&app, "root", "RootPW!123").await;

    let (status, body) = request_json(
        &app,
        "POST",
        "/bodyweight/",
        &root_token,
        Some(serde_json::json!({"user_id": alice.id, "weight": 77.0})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], alice.id);
}

#[tokio::test]
async fn cross_account_reads_are_forbidden() {
    let (app, state) = spawn_app().await;
    seed_account(&state, "alice", "Secret123!", false).await;
    seed_account(&state, "bob", "Hunter2!!", false).await;
    seed_account(&state, "root", "RootPW!123", true).await;

    let alice_token = login(&app, "alice", "Secret123!").await;
    let (_, created) = request_json(
        &app,
        "POST",
        "/bodyweight/",
        &alice_token,
        Some(serde_json::json!({"weight": 82.5})),
    )
    .await;
    let entry_id = created["id"].as_i64().unwrap();

    let bob_token = login(&app, "bob", "Hunter2!!").await;
    let (status, _) = request_json(
        &app,
        "GET",
        &format!("/bodyweight/{entry_id}"),
        &bob_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let root_token = login(&app, "root", "RootPW!123").await;
    let (status, body) = request_json(
        &app,
        "GET",
        &format!("/bodyweight/{entry_id}"),
        &root_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["weight"], 82.5);
}

#[tokio::test]
async fn update_and_delete_own_entry() {
    let (app, state) = spawn_app().await;
    seed_account(&state, "alice", "Secret123!", false).await;
    let token = login(&app, "alice", "Secret123!").await;

    let (_, created) = request_json(
        &app,
        "POST",
        "/bodyweight/",
        &token,
        Some(serde_json::json!({"weight": 82.5, "comment": "evening"})),
    )
    .await;
    let entry_id = created["id"].as_i64().unwrap();

    let (status, updated) = request_json(
        &app,
        "PUT",
        &format!("/bodyweight/{entry_id}"),
        &token,
        Some(serde_json::json!({"weight": 81.9, "comment": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["weight"], 81.9);
    assert!(updated["comment"].is_null());

    let (status, _) = request_json(
        &app,
        "DELETE",
        &format!("/bodyweight/{entry_id}"),
        &token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request_json(
        &app,
        "GET",
        &format!("/bodyweight/{entry_id}"),
        &token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn weight_bounds_are_enforced() {
    let (app, state) = spawn_app().await;
    seed_account(&state, "alice", "Secret123!", false).await;
    let token = login(&app, "alice", "Secret123!").await;

    for bad_weight in [0.0, -5.0, 1200.0] {
        let (status, _) = request_json(
            &app,
            "POST",
            "/bodyweight/",
            &token,
            Some(serde_json::json!({"weight": bad_weight})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "weight {bad_weight}");
    }
}

#[tokio::test]
async fn missing_entry_is_404_only_for_valid_tokens() {
    let (app, state) = spawn_app().await;
    seed_account(&state, "alice", "Secret123!", false).await;
    let token = login(&app, "alice", "Secret123!").await;

    let (status, _) = request_json(&app, "GET", "/bodyweight/99999", &token, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = request_json(&app, "GET", "/bodyweight/99999", "not-a-real-token", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bad_timestamps_are_rejected() {
    let (app, state) = spawn_app().await;
    seed_account(&state, "alice", "Secret123!", false).await;
    let token = login(&app, "alice", "Secret123!").await;

    let (status, _) = request_json(
        &app,
        "POST",
        "/bodyweight/",
        &token,
        Some(serde_json::json!({"weight": 82.0, "recorded_at": "last tuesday"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = request_json(
        &app,
        "POST",
        "/bodyweight/",
        &token,
        Some(serde_json::json!({"weight": 82.0, "recorded_at": "2026-08-01T07:30:00Z"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recorded_at"], "2026-08-01T07:30:00Z");
}
