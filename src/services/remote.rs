use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::Result;
use crate::models::{Profile, Video};

/// 远程文档存储的窄接口
///
/// 拉取方法返回原始 JSON 载荷，由 [`crate::services::decode`] 统一解码校验。
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn fetch_all_profiles(&self) -> Result<Value>;

    async fn fetch_all_videos(&self) -> Result<Value>;

    async fn upsert_profile(&self, profile: &Profile) -> Result<()>;

    async fn upsert_video(&self, video: &Video) -> Result<()>;

    async fn delete_video(&self, id: &str) -> Result<()>;

    /// 写入在线心跳，不得因此创建新的资料记录
    async fn touch_presence(&self, username: &str, at: DateTime<Utc>) -> Result<()>;
}
