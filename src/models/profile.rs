use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

use super::notification::Notification;
use crate::utils::serde_helpers::{lenient_count, lenient_millis};

/// 用户资料记录，以 username 为主键
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub username: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_count::deserialize")]
    pub followers: u64,
    #[serde(default, deserialize_with = "lenient_count::deserialize")]
    pub following: u64,
    #[serde(default, deserialize_with = "lenient_count::deserialize")]
    pub likes: u64,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub banned: bool,
    /// 关注关系：username -> 是否关注
    #[serde(default)]
    pub follows: BTreeMap<String, bool>,
    #[serde(default)]
    pub notifications: Vec<Notification>,
    #[serde(default, with = "lenient_millis")]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(default, with = "lenient_millis")]
    pub username_changed_at: Option<DateTime<Utc>>,
    #[serde(default, with = "lenient_millis")]
    pub display_name_changed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    #[serde(default, with = "lenient_millis")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Profile {
    pub fn new(username: String, display_name: String, password_hash: String, now: DateTime<Utc>) -> Self {
        Self {
            username,
            display_name,
            bio: String::new(),
            avatar_url: None,
            followers: 0,
            following: 0,
            likes: 0,
            verified: false,
            admin: false,
            banned: false,
            follows: BTreeMap::new(),
            notifications: Vec::new(),
            last_seen: Some(now),
            username_changed_at: None,
            display_name_changed_at: None,
            password_hash: Some(password_hash),
            created_at: Some(now),
        }
    }

    pub fn is_following(&self, username: &str) -> bool {
        self.follows.get(username).copied().unwrap_or(false)
    }

    /// 最近 `window` 内有心跳即视为在线
    pub fn is_online(&self, now: DateTime<Utc>, window: Duration) -> bool {
        match self.last_seen {
            Some(seen) => now.signed_duration_since(seen) <= window,
            None => false,
        }
    }

    pub fn unread_notifications(&self) -> usize {
        self.notifications.iter().filter(|n| !n.read).count()
    }

    pub fn to_view(&self, now: DateTime<Utc>, online_window: Duration) -> ProfileView {
        ProfileView {
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            bio: self.bio.clone(),
            avatar_url: self.avatar_url.clone(),
            followers: self.followers,
            following: self.following,
            likes: self.likes,
            verified: self.verified,
            admin: self.admin,
            banned: self.banned,
            online: self.is_online(now, online_window),
            last_seen: self.last_seen,
        }
    }
}

/// 对外展示的资料，不含密码哈希和通知
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub username: String,
    pub display_name: String,
    pub bio: String,
    pub avatar_url: Option<String>,
    pub followers: u64,
    pub following: u64,
    pub likes: u64,
    pub verified: bool,
    pub admin: bool,
    pub banned: bool,
    pub online: bool,
    #[serde(with = "lenient_millis")]
    pub last_seen: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[validate(length(min = 3, max = 30))]
    pub username: String,

    #[validate(length(min = 1, max = 50))]
    pub display_name: Option<String>,

    #[validate(length(min = 6, max = 128))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 50))]
    pub display_name: Option<String>,

    pub bio: Option<String>,

    #[validate(url)]
    pub avatar_url: Option<String>,
}
