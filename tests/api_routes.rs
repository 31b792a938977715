mod common;

use axum::{
    body::{Body, HttpBody},
    http::{header, Request, StatusCode},
    Router,
};
use clipfeed::{routes, services::SyncEngine, state::AppState};
use common::{harness, seed_user, Harness, PASSWORD};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app(h: Harness) -> (Router, Arc<common::FakeRemote>) {
    let Harness {
        controller,
        feed,
        remote,
        ..
    } = h;
    let sync_engine = Arc::new(SyncEngine::new(remote.clone(), feed));
    let state = Arc::new(AppState::new(
        controller.config().clone(),
        Arc::new(controller),
        sync_engine,
    ));
    (routes::api_router().with_state(state), remote)
}

async fn call(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let mut body = response.into_body();
    let mut bytes = Vec::new();
    while let Some(chunk) = body.data().await {
        bytes.extend_from_slice(&chunk.unwrap());
    }
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn login(app: &Router, username: &str) -> String {
    let (status, body) = call(
        app,
        "POST",
        "/api/session/login",
        None,
        Some(json!({ "username": username, "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let (app, _) = app(harness());
    let (status, body) = call(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_login_and_me() {
    let h = harness();
    seed_user(&h.feed, "alice");
    let (app, _) = app(h);

    let token = login(&app, "alice").await;
    let (status, body) = call(&app, "GET", "/api/session/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "alice");
    assert!(body["data"].get("passwordHash").is_none());

    let (status, body) = call(&app, "GET", "/api/session/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTHENTICATION_ERROR");

    let (status, _) = call(
        &app,
        "POST",
        "/api/session/login",
        None,
        Some(json!({ "username": "alice", "password": "nope-nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_publish_like_and_comment() {
    let h = harness();
    seed_user(&h.feed, "alice");
    seed_user(&h.feed, "bob");
    let (app, _) = app(h);
    let alice = login(&app, "alice").await;
    let bob = login(&app, "bob").await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/videos",
        Some(&alice),
        Some(json!({ "mediaUrl": "https://cdn.example/a.mp4", "description": "first!" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_str().unwrap().to_string();
    assert!(id.starts_with('v'));

    let (status, body) = call(&app, "POST", &format!("/api/videos/{}/like", id), Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["likes"], 1);

    let (status, body) = call(
        &app,
        "POST",
        &format!("/api/videos/{}/comments", id),
        Some(&bob),
        Some(json!({ "text": "love it" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["comments"][0]["text"], "love it");

    let (status, body) = call(&app, "GET", "/api/feed/videos", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = call(&app, "GET", "/api/profiles/me/notifications", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, _) = call(&app, "DELETE", &format!("/api/videos/{}", id), Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_follow_route() {
    let h = harness();
    seed_user(&h.feed, "alice");
    seed_user(&h.feed, "bob");
    let (app, _) = app(h);
    let alice = login(&app, "alice").await;

    let (status, body) = call(&app, "POST", "/api/profiles/bob/follow", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["followers"], 1);

    let (status, body) = call(&app, "DELETE", "/api/profiles/bob/follow", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["followers"], 0);

    let (status, _) = call(&app, "GET", "/api/profiles/nobody", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_manual_sync_and_status() {
    let h = harness();
    *h.remote.videos.lock() = json!([common::video_json("v300-cc", "bob", 2)]);
    let (app, remote) = app(h);

    let (status, body) = call(&app, "POST", "/api/sync/run", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "applied");

    let (_, body) = call(&app, "GET", "/api/sync/status", None, None).await;
    assert_eq!(body["data"]["online"], true);
    assert_eq!(body["data"]["passes"], 1);

    remote.set_offline(true);
    let (_, body) = call(&app, "POST", "/api/sync/run", None, None).await;
    assert_eq!(body["data"]["status"], "offline");

    // 离线后仍能读到上次同步的数据
    let (_, body) = call(&app, "GET", "/api/feed/videos", None, None).await;
    assert_eq!(body["data"][0]["id"], "v300-cc");
}
