use crate::{
    error::Result,
    models::{
        profile::{LoginRequest, SignupRequest},
        response::ApiResponse,
        session::SessionResponse,
        ProfileView,
    },
    state::AppState,
    utils::middleware::CurrentUser,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

/// 注册并直接登录
/// POST /api/session/signup
pub async fn signup(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SessionResponse>>)> {
    info!("Signup request for {}", request.username);
    let session = app_state.controller.signup(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(session))))
}

/// POST /api/session/login
pub async fn login(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<SessionResponse>>> {
    let session = app_state.controller.login(request).await?;
    Ok(Json(ApiResponse::success(session)))
}

/// POST /api/session/logout
pub async fn logout(State(app_state): State<Arc<AppState>>, user: CurrentUser) -> Json<Value> {
    app_state.controller.logout(user.token());
    Json(json!({
        "success": true,
        "message": "Logged out"
    }))
}

/// 当前登录用户的资料
/// GET /api/session/me
pub async fn me(State(app_state): State<Arc<AppState>>, user: CurrentUser) -> Result<Json<ApiResponse<ProfileView>>> {
    let profile = app_state.controller.profile(user.username())?;
    Ok(Json(ApiResponse::success(profile)))
}
