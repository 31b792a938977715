use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 单次同步的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// 已合并并写回本地
    Applied {
        profiles: usize,
        videos: usize,
        skipped_records: usize,
    },
    /// 远程不可用或数据格式错误，本地状态保持不变
    Offline { reason: String },
    /// 合并完成但写入本地缓存失败，内存状态未替换
    PersistFailed { reason: String },
    /// 已有同步正在进行，本次请求被丢弃
    AlreadyRunning,
}

impl SyncOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, SyncOutcome::Applied { .. })
    }
}

/// 同步状态，供界面显示“离线模式”
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub online: bool,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub passes: u64,
    pub skipped_passes: u64,
    pub skipped_records: u64,
}
