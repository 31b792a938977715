use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::profile::ProfileView;

/// 登录会话，token 为不透明的 bearer 令牌
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub username: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub token: String,
    pub profile: ProfileView,
}
