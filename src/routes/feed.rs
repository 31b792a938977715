use crate::{
    error::Result,
    models::{feed::Discover, response::ApiResponse, Video},
    state::AppState,
    utils::middleware::CurrentUser,
};
use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/videos", get(list_videos))
        .route("/following", get(following_feed))
        .route("/discover", get(discover))
}

#[derive(Debug, Deserialize)]
pub struct DiscoverQuery {
    pub q: Option<String>,
}

/// 全部视频，按发布时间倒序
/// GET /api/feed/videos
pub async fn list_videos(State(app_state): State<Arc<AppState>>) -> Json<ApiResponse<Vec<Video>>> {
    Json(ApiResponse::success(app_state.controller.feed()))
}

/// 关注的人发布的视频
/// GET /api/feed/following
pub async fn following_feed(
    State(app_state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<Vec<Video>>>> {
    let videos = app_state.controller.following_feed(user.username())?;
    Ok(Json(ApiResponse::success(videos)))
}

/// 发现与搜索
/// GET /api/feed/discover?q=
pub async fn discover(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<DiscoverQuery>,
) -> Json<ApiResponse<Discover>> {
    debug!("Discover query: {:?}", query.q);
    Json(ApiResponse::success(app_state.controller.discover(query.q.as_deref())))
}
