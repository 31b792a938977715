use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::state::AppState;

pub mod admin;
pub mod feed;
pub mod generate;
pub mod profiles;
pub mod session;
pub mod sync;
pub mod videos;

/// 全部 API 路由，不含 CORS、压缩等外层中间件
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .nest("/api/feed", feed::router())
        .nest("/api/profiles", profiles::router())
        .nest("/api/session", session::router())
        .nest("/api/videos", videos::router())
        .nest("/api/admin", admin::router())
        .nest("/api/sync", sync::router())
        .nest("/api/generate", generate::router())
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "clipfeed",
    }))
}
