use crate::{
    error::Result,
    models::{profile::UpdateProfileRequest, response::ApiResponse, Notification, ProfileView, Video},
    state::AppState,
    utils::middleware::CurrentUser,
};
use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tracing::debug;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        // 需要认证的路由
        .route("/me", put(update_my_profile))
        .route("/me/notifications", get(my_notifications))
        .route("/me/notifications/read", post(mark_notifications_read))
        // 公开路由
        .route("/:username", get(get_profile))
        .route("/:username/videos", get(get_profile_videos))
        .route("/:username/follow", post(follow).delete(unfollow))
}

/// GET /api/profiles/:username
pub async fn get_profile(
    State(app_state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<ProfileView>>> {
    let profile = app_state.controller.profile(&username)?;
    Ok(Json(ApiResponse::success(profile)))
}

/// GET /api/profiles/:username/videos
pub async fn get_profile_videos(
    State(app_state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<Vec<Video>>>> {
    let videos = app_state.controller.profile_videos(&username)?;
    Ok(Json(ApiResponse::success(videos)))
}

/// 更新自己的资料，显示名称受冷却期限制
/// PUT /api/profiles/me
pub async fn update_my_profile(
    State(app_state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<ProfileView>>> {
    debug!("Updating profile for {}", user.username());
    let snapshot = app_state.controller.update_profile(user.username(), request).await?;
    let profile = app_state.controller.profile_in(&snapshot, user.username())?;
    Ok(Json(ApiResponse::success(profile).with_message("Profile updated")))
}

/// POST /api/profiles/:username/follow
pub async fn follow(
    State(app_state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<ProfileView>>> {
    debug!("User {} following {}", user.username(), username);
    let snapshot = app_state.controller.follow(user.username(), &username).await?;
    let profile = app_state.controller.profile_in(&snapshot, &username)?;
    Ok(Json(ApiResponse::success(profile)))
}

/// DELETE /api/profiles/:username/follow
pub async fn unfollow(
    State(app_state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<ProfileView>>> {
    debug!("User {} unfollowing {}", user.username(), username);
    let snapshot = app_state.controller.unfollow(user.username(), &username).await?;
    let profile = app_state.controller.profile_in(&snapshot, &username)?;
    Ok(Json(ApiResponse::success(profile)))
}

/// GET /api/profiles/me/notifications
pub async fn my_notifications(
    State(app_state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<Vec<Notification>>>> {
    let notifications = app_state.controller.notifications(user.username())?;
    Ok(Json(ApiResponse::success(notifications)))
}

/// POST /api/profiles/me/notifications/read
pub async fn mark_notifications_read(
    State(app_state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<Vec<Notification>>>> {
    app_state.controller.mark_notifications_read(user.username()).await?;
    let notifications = app_state.controller.notifications(user.username())?;
    Ok(Json(ApiResponse::success(notifications)))
}
