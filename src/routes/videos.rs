use crate::{
    error::{AppError, Result},
    models::{
        response::ApiResponse,
        video::{CommentRequest, PublishVideoRequest},
        FeedSnapshot, Video,
    },
    state::AppState,
    utils::middleware::{CurrentUser, OptionalUser},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(publish_video))
        .route("/:id", get(get_video).delete(delete_video))
        .route("/:id/like", post(toggle_like))
        .route("/:id/repost", post(toggle_repost))
        .route("/:id/view", post(record_view))
        .route("/:id/comments", post(add_comment))
        .route("/:id/comments/:comment_id", delete(delete_comment))
        .route("/:id/comments/:comment_id/replies", post(add_reply))
}

fn video_in(snapshot: &FeedSnapshot, id: &str) -> Result<Video> {
    snapshot
        .video(id)
        .cloned()
        .ok_or_else(|| AppError::not_found("Video"))
}

/// GET /api/videos/:id
pub async fn get_video(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Video>>> {
    let video = video_in(&app_state.controller.snapshot(), &id)?;
    Ok(Json(ApiResponse::success(video)))
}

/// 发布视频
/// POST /api/videos
pub async fn publish_video(
    State(app_state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(request): Json<PublishVideoRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Video>>)> {
    let (snapshot, id) = app_state.controller.publish_video(user.username(), request).await?;
    let video = video_in(&snapshot, &id)?;

    info!("Video {} published by {}", video.id, user.username());
    Ok((StatusCode::CREATED, Json(ApiResponse::success(video))))
}

/// 删除视频（发布者或管理员）
/// DELETE /api/videos/:id
pub async fn delete_video(
    State(app_state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    app_state.controller.delete_video(user.username(), &id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Video deleted"
    })))
}

/// 点赞 / 取消点赞
/// POST /api/videos/:id/like
pub async fn toggle_like(
    State(app_state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Video>>> {
    let snapshot = app_state.controller.toggle_like(user.username(), &id).await?;
    Ok(Json(ApiResponse::success(video_in(&snapshot, &id)?)))
}

/// 转发 / 取消转发
/// POST /api/videos/:id/repost
pub async fn toggle_repost(
    State(app_state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Video>>> {
    let snapshot = app_state.controller.toggle_repost(user.username(), &id).await?;
    Ok(Json(ApiResponse::success(video_in(&snapshot, &id)?)))
}

/// 记录一次播放，未登录也可以
/// POST /api/videos/:id/view
pub async fn record_view(
    State(app_state): State<Arc<AppState>>,
    OptionalUser(viewer): OptionalUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Video>>> {
    debug!(
        "View on {} by {}",
        id,
        viewer.as_ref().map(|s| s.username.as_str()).unwrap_or("anonymous")
    );
    let snapshot = app_state.controller.record_view(&id).await?;
    Ok(Json(ApiResponse::success(video_in(&snapshot, &id)?)))
}

/// POST /api/videos/:id/comments
pub async fn add_comment(
    State(app_state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<CommentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Video>>)> {
    let snapshot = app_state
        .controller
        .add_comment(user.username(), &id, &request.text)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(video_in(&snapshot, &id)?))))
}

/// POST /api/videos/:id/comments/:comment_id/replies
pub async fn add_reply(
    State(app_state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((id, comment_id)): Path<(String, String)>,
    Json(request): Json<CommentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Video>>)> {
    let snapshot = app_state
        .controller
        .add_reply(user.username(), &id, &comment_id, &request.text)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(video_in(&snapshot, &id)?))))
}

/// DELETE /api/videos/:id/comments/:comment_id
pub async fn delete_comment(
    State(app_state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((id, comment_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<Video>>> {
    let snapshot = app_state
        .controller
        .delete_comment(user.username(), &id, &comment_id)
        .await?;
    Ok(Json(ApiResponse::success(video_in(&snapshot, &id)?)))
}
