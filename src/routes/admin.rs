use crate::{
    error::Result,
    models::{response::ApiResponse, ProfileView},
    state::AppState,
    utils::middleware::CurrentUser,
};
use axum::{
    extract::{Path, State},
    response::Json,
    routing::{delete, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

/// 管理员操作，权限在控制器中校验
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/profiles/:username/ban", post(ban))
        .route("/profiles/:username/unban", post(unban))
        .route("/profiles/:username/verify", post(verify))
        .route("/profiles/:username/unverify", post(unverify))
        .route("/videos/:id", delete(remove_video))
}

async fn set_banned(app_state: &AppState, admin: &str, username: &str, banned: bool) -> Result<ProfileView> {
    let snapshot = app_state.controller.set_banned(admin, username, banned).await?;
    app_state.controller.profile_in(&snapshot, username)
}

async fn set_verified(app_state: &AppState, admin: &str, username: &str, verified: bool) -> Result<ProfileView> {
    let snapshot = app_state.controller.set_verified(admin, username, verified).await?;
    app_state.controller.profile_in(&snapshot, username)
}

/// POST /api/admin/profiles/:username/ban
pub async fn ban(
    State(app_state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<ProfileView>>> {
    let profile = set_banned(&app_state, user.username(), &username, true).await?;
    Ok(Json(ApiResponse::success(profile).with_message(format!("{} banned", username))))
}

/// POST /api/admin/profiles/:username/unban
pub async fn unban(
    State(app_state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<ProfileView>>> {
    let profile = set_banned(&app_state, user.username(), &username, false).await?;
    Ok(Json(ApiResponse::success(profile).with_message(format!("{} unbanned", username))))
}

/// POST /api/admin/profiles/:username/verify
pub async fn verify(
    State(app_state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<ProfileView>>> {
    let profile = set_verified(&app_state, user.username(), &username, true).await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// POST /api/admin/profiles/:username/unverify
pub async fn unverify(
    State(app_state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<ProfileView>>> {
    let profile = set_verified(&app_state, user.username(), &username, false).await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// DELETE /api/admin/videos/:id
pub async fn remove_video(
    State(app_state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    app_state.controller.delete_video(user.username(), &id).await?;
    info!("Video {} removed by {}", id, user.username());
    Ok(Json(json!({
        "success": true,
        "message": "Video removed"
    })))
}
