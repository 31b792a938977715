//! 本地工作集与远程存储的对账
//!
//! 每次同步并发拉取全部资料和视频，解码校验后与当前快照合并（远程优先），
//! 再写回本地缓存与内存。任何拉取失败或载荷格式错误都会跳过整个合并，
//! 本地状态原样保留，进入“离线模式”。同一时间最多只有一次同步在进行，
//! 期间到来的触发直接丢弃。
//!
//! 远程优先意味着一次刚做的本地修改（比如点赞）可能被下一次拉取到的
//! 旧远程值覆盖，这是有意保留的弱一致性。

use chrono::Utc;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::models::sync::{SyncOutcome, SyncStatus};
use crate::models::{Profile, Video};
use crate::services::decode::{decode_batch, Decoded};
use crate::services::feed::FeedStore;
use crate::services::merge::merge_snapshot;
use crate::services::remote::RemoteStore;
use crate::services::scheduler::{spawn_loop, TaskHandle, Trigger};

pub struct SyncEngine {
    remote: Arc<dyn RemoteStore>,
    feed: FeedStore,
    in_flight: AtomicBool,
    status: RwLock<SyncStatus>,
}

/// 持有期间标记同步进行中，drop 时释放
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl SyncEngine {
    pub fn new(remote: Arc<dyn RemoteStore>, feed: FeedStore) -> Self {
        Self {
            remote,
            feed,
            in_flight: AtomicBool::new(false),
            status: RwLock::new(SyncStatus::default()),
        }
    }

    pub fn status(&self) -> SyncStatus {
        self.status.read().clone()
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// 执行一次同步
    pub async fn run_once(&self) -> SyncOutcome {
        let _guard = match InFlightGuard::acquire(&self.in_flight) {
            Some(guard) => guard,
            None => {
                debug!("Sync pass already in flight, dropping trigger");
                self.status.write().skipped_passes += 1;
                return SyncOutcome::AlreadyRunning;
            }
        };

        let (profiles, videos) = tokio::join!(
            self.remote.fetch_all_profiles(),
            self.remote.fetch_all_videos()
        );

        let outcome = match Self::decode(profiles, videos) {
            Ok((profiles, videos)) => self.apply(profiles, videos),
            Err(reason) => {
                warn!("Remote sync failed, keeping local state: {}", reason);
                SyncOutcome::Offline { reason }
            }
        };

        self.record(&outcome);
        outcome
    }

    fn decode(
        profiles: Result<Value>,
        videos: Result<Value>,
    ) -> std::result::Result<(Decoded<Profile>, Decoded<Video>), String> {
        let profiles = profiles.map_err(|e| format!("fetch profiles: {}", e))?;
        let videos = videos.map_err(|e| format!("fetch videos: {}", e))?;

        let profiles = decode_batch::<Profile>(profiles).map_err(|e| e.to_string())?;
        let videos = decode_batch::<Video>(videos).map_err(|e| e.to_string())?;
        Ok((profiles, videos))
    }

    fn apply(&self, profiles: Decoded<Profile>, videos: Decoded<Video>) -> SyncOutcome {
        let skipped_records = profiles.skipped + videos.skipped;
        let merged = self.feed.apply(|local| {
            Ok((merge_snapshot(local, &profiles.records, &videos.records), ()))
        });

        match merged {
            Ok((snapshot, ())) => {
                debug!(
                    "Sync merged {} remote profiles and {} remote videos ({} skipped)",
                    profiles.records.len(),
                    videos.records.len(),
                    skipped_records
                );
                SyncOutcome::Applied {
                    profiles: snapshot.profiles.len(),
                    videos: snapshot.videos.len(),
                    skipped_records,
                }
            }
            Err(e) => {
                warn!("Failed to persist merged snapshot: {}", e);
                SyncOutcome::PersistFailed { reason: e.to_string() }
            }
        }
    }

    fn record(&self, outcome: &SyncOutcome) {
        let mut status = self.status.write();
        status.passes += 1;
        match outcome {
            SyncOutcome::Applied { skipped_records, .. } => {
                if !status.online {
                    info!("Remote store reachable, leaving offline mode");
                }
                status.online = true;
                status.last_success = Some(Utc::now());
                status.last_error = None;
                status.skipped_records += *skipped_records as u64;
            }
            SyncOutcome::Offline { reason } => {
                status.online = false;
                status.last_error = Some(reason.clone());
            }
            SyncOutcome::PersistFailed { reason } => {
                status.last_error = Some(reason.clone());
            }
            SyncOutcome::AlreadyRunning => {}
        }
    }
}

/// 启动同步循环，每次触发在独立任务中执行一次同步
pub fn spawn_sync_loop<T: Trigger + 'static>(engine: Arc<SyncEngine>, trigger: T) -> TaskHandle {
    spawn_loop("sync", trigger, move || {
        let engine = engine.clone();
        async move {
            engine.run_once().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::local::{LocalCache, MemoryStore};
    use async_trait::async_trait;
    use chrono::DateTime;
    use serde_json::json;

    struct StaticRemote {
        profiles: Value,
        videos: Value,
    }

    #[async_trait]
    impl RemoteStore for StaticRemote {
        async fn fetch_all_profiles(&self) -> Result<Value> {
            Ok(self.profiles.clone())
        }
        async fn fetch_all_videos(&self) -> Result<Value> {
            Ok(self.videos.clone())
        }
        async fn upsert_profile(&self, _profile: &Profile) -> Result<()> {
            Ok(())
        }
        async fn upsert_video(&self, _video: &Video) -> Result<()> {
            Ok(())
        }
        async fn delete_video(&self, _id: &str) -> Result<()> {
            Ok(())
        }
        async fn touch_presence(&self, _username: &str, _at: DateTime<Utc>) -> Result<()> {
            Ok(())
        }
    }

    fn engine(profiles: Value, videos: Value) -> SyncEngine {
        let feed = FeedStore::load(LocalCache::new(Arc::new(MemoryStore::new())));
        SyncEngine::new(Arc::new(StaticRemote { profiles, videos }), feed)
    }

    #[tokio::test]
    async fn test_applied_pass_updates_status() {
        let engine = engine(
            json!([{"username": "alice"}, {"displayName": "no key"}]),
            json!([{"id": "v1", "username": "alice"}]),
        );

        let outcome = engine.run_once().await;
        assert_eq!(
            outcome,
            SyncOutcome::Applied { profiles: 1, videos: 1, skipped_records: 1 }
        );

        let status = engine.status();
        assert!(status.online);
        assert_eq!(status.passes, 1);
        assert_eq!(status.skipped_records, 1);
        assert!(status.last_success.is_some());
        assert!(!engine.is_running());
    }

    #[tokio::test]
    async fn test_malformed_payload_goes_offline() {
        let engine = engine(json!({"alice": {}}), json!([]));
        let outcome = engine.run_once().await;
        assert!(matches!(outcome, SyncOutcome::Offline { .. }));

        let status = engine.status();
        assert!(!status.online);
        assert!(status.last_error.unwrap().contains("not an array"));
    }
}
