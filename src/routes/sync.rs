use crate::{
    models::{
        response::ApiResponse,
        sync::{SyncOutcome, SyncStatus},
    },
    state::AppState,
};
use axum::{extract::State, response::Json, routing::{get, post}, Router};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", get(status))
        .route("/run", post(run))
}

/// 同步状态，`online = false` 表示离线模式
/// GET /api/sync/status
pub async fn status(State(app_state): State<Arc<AppState>>) -> Json<ApiResponse<SyncStatus>> {
    Json(ApiResponse::success(app_state.sync_engine.status()))
}

/// 手动触发一次同步；已有同步在进行时直接返回 already_running
/// POST /api/sync/run
pub async fn run(State(app_state): State<Arc<AppState>>) -> Json<ApiResponse<SyncOutcome>> {
    Json(ApiResponse::success(app_state.sync_engine.run_once().await))
}
