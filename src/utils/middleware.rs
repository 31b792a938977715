use crate::{error::AppError, models::session::Session, state::AppState};
use async_trait::async_trait;
use axum::{
    body::Body,
    extract::FromRequestParts,
    headers::{authorization::Bearer, Authorization},
    http::{request::Parts, HeaderValue, Request},
    middleware::Next,
    response::Response,
    TypedHeader,
};
use std::sync::Arc;
use tracing::debug;

/// 已登录用户提取器，缺少或无效的 bearer token 返回 401
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Session);

impl CurrentUser {
    pub fn username(&self) -> &str {
        &self.0.username
    }

    pub fn token(&self) -> &str {
        &self.0.token
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::unauthorized("缺少认证信息"))?;

        let session = state.controller.session(bearer.token())?;
        debug!("Authenticated request from {}", session.username);
        Ok(CurrentUser(session))
    }
}

/// 可选认证提取器，未登录时为 None
pub struct OptionalUser(pub Option<Session>);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for OptionalUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let session = match TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state).await {
            Ok(TypedHeader(Authorization(bearer))) => state.controller.session(bearer.token()).ok(),
            Err(_) => None,
        };
        Ok(OptionalUser(session))
    }
}

/// 请求 ID 中间件
pub async fn request_id_middleware(mut request: Request<Body>, next: Next<Body>) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    request.extensions_mut().insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// 请求 ID 包装器
#[derive(Debug, Clone)]
pub struct RequestId(pub String);
