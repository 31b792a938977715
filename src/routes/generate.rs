use crate::{
    error::Result,
    models::response::ApiResponse,
    state::AppState,
    utils::middleware::CurrentUser,
};
use axum::{extract::State, response::Json, routing::post, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use validator::Validate;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/caption", post(caption))
        .route("/video", post(video))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CaptionRequest {
    #[validate(length(max = 2200))]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct CaptionResponse {
    pub caption: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VideoPromptRequest {
    #[validate(length(min = 1, max = 2200))]
    pub prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedVideo {
    pub media_url: String,
}

/// 生成配文，服务不可用时返回原文
/// POST /api/generate/caption
pub async fn caption(
    State(app_state): State<Arc<AppState>>,
    _user: CurrentUser,
    Json(request): Json<CaptionRequest>,
) -> Result<Json<ApiResponse<CaptionResponse>>> {
    request.validate()?;
    let caption = app_state.controller.suggest_caption(&request.text).await;
    Ok(Json(ApiResponse::success(CaptionResponse { caption })))
}

/// 根据提示词生成视频，返回媒体地址，发布由客户端另行调用
/// POST /api/generate/video
pub async fn video(
    State(app_state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(request): Json<VideoPromptRequest>,
) -> Result<Json<ApiResponse<GeneratedVideo>>> {
    request.validate()?;
    debug!("Generating video for {}", user.username());
    let media_url = app_state
        .controller
        .generate_video(user.username(), &request.prompt)
        .await?;
    Ok(Json(ApiResponse::success(GeneratedVideo { media_url })))
}
