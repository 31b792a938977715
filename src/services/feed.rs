use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::models::FeedSnapshot;
use crate::services::local::LocalCache;

/// 当前快照的共享持有者
///
/// 同步引擎和控制器通过它读写工作集。每次变更都在写锁内基于最新快照计算，
/// 先写入本地缓存，成功后才替换内存中的快照。
#[derive(Clone)]
pub struct FeedStore {
    current: Arc<RwLock<Arc<FeedSnapshot>>>,
    cache: LocalCache,
}

impl FeedStore {
    /// 从本地缓存恢复上次的工作集
    pub fn load(cache: LocalCache) -> Self {
        let snapshot = cache.load_snapshot();
        debug!(
            "Restored {} profiles and {} videos from local cache",
            snapshot.profiles.len(),
            snapshot.videos.len()
        );
        Self {
            current: Arc::new(RwLock::new(Arc::new(snapshot))),
            cache,
        }
    }

    pub fn snapshot(&self) -> Arc<FeedSnapshot> {
        self.current.read().clone()
    }

    /// 基于当前快照计算新快照并持久化，返回新快照和附带结果
    pub fn apply<F, R>(&self, f: F) -> Result<(Arc<FeedSnapshot>, R)>
    where
        F: FnOnce(&FeedSnapshot) -> Result<(FeedSnapshot, R)>,
    {
        let mut current = self.current.write();
        let (next, extra) = f(&current)?;
        self.cache.save_snapshot(&next)?;
        let next = Arc::new(next);
        *current = next.clone();
        Ok((next, extra))
    }
}
