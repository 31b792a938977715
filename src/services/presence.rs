use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::services::remote::RemoteStore;
use crate::services::scheduler::{spawn_loop, IntervalTrigger, TaskHandle};

/// 在线心跳
///
/// 每个活跃会话一个定时循环，登录时启动（立即写一次），登出时停止。
/// 心跳写入是尽力而为的，失败只记录日志，不影响同步。
pub struct PresenceService {
    remote: Arc<dyn RemoteStore>,
    interval: Duration,
    loops: Mutex<HashMap<String, TaskHandle>>,
}

impl PresenceService {
    pub fn new(remote: Arc<dyn RemoteStore>, interval: Duration) -> Self {
        Self {
            remote,
            interval,
            loops: Mutex::new(HashMap::new()),
        }
    }

    /// 为会话启动心跳循环，需在 tokio 运行时内调用
    pub fn arm(&self, token: &str, username: &str) {
        let remote = self.remote.clone();
        let user = username.to_string();
        let handle = spawn_loop(
            format!("presence:{}", username),
            IntervalTrigger::new(self.interval),
            move || {
                let remote = remote.clone();
                let user = user.clone();
                async move {
                    touch(remote.as_ref(), &user).await;
                }
            },
        );

        // 同一 token 重复启动时替换旧循环
        if let Some(previous) = self.loops.lock().insert(token.to_string(), handle) {
            previous.cancel();
        }
        debug!("Presence armed for {}", username);
    }

    pub fn disarm(&self, token: &str) -> bool {
        match self.loops.lock().remove(token) {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    pub fn disarm_all(&self) {
        let handles: Vec<TaskHandle> = self.loops.lock().drain().map(|(_, h)| h).collect();
        for handle in handles {
            handle.cancel();
        }
    }

    pub fn armed_count(&self) -> usize {
        self.loops.lock().len()
    }
}

pub async fn touch(remote: &dyn RemoteStore, username: &str) {
    match remote.touch_presence(username, Utc::now()).await {
        Ok(()) => debug!("Presence updated for {}", username),
        Err(e) if e.is_remote_failure() => debug!("Presence update skipped (offline): {}", e),
        Err(e) => warn!("Presence update failed for {}: {}", username, e),
    }
}
