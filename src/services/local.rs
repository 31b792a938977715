//! 本地持久化缓存
//!
//! `LocalStore` 是同步的键值接口，类似浏览器的 localStorage。
//! `LocalCache` 在其上按固定键保存资料和视频集合。

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::models::{FeedSnapshot, Profile, Video};

pub const PROFILES_KEY: &str = "profiles";
pub const VIDEOS_KEY: &str = "videos";

pub trait LocalStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>>;

    fn save(&self, key: &str, value: &str) -> Result<()>;
}

/// 每个键对应目录下的一个 `<key>.json` 文件
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        debug!("Local cache directory: {}", dir.display());
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(AppError::LocalStorage(format!("invalid cache key: {:?}", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl LocalStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        // 先写临时文件再重命名，避免写到一半的缓存
        let tmp = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前内容的拷贝（测试中用于逐字节比较）
    pub fn dump(&self) -> HashMap<String, String> {
        self.data.read().clone()
    }
}

impl LocalStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        self.data.write().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// 资料与视频集合的本地缓存
#[derive(Clone)]
pub struct LocalCache {
    store: Arc<dyn LocalStore>,
}

impl LocalCache {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    /// 读取缓存的快照；缓存缺失或损坏时从空集合开始
    pub fn load_snapshot(&self) -> FeedSnapshot {
        let profiles: Vec<Profile> = self.load_list(PROFILES_KEY);
        let videos: Vec<Video> = self.load_list(VIDEOS_KEY);

        let profiles: BTreeMap<String, Profile> = profiles
            .into_iter()
            .map(|p| (p.username.clone(), p))
            .collect();

        FeedSnapshot::new(profiles, videos)
    }

    /// 两个集合要么都写入，要么都保持原样
    pub fn save_snapshot(&self, snapshot: &FeedSnapshot) -> Result<()> {
        let profiles: Vec<&Profile> = snapshot.profiles.values().collect();
        let profiles = serde_json::to_string(&profiles)?;
        let videos = serde_json::to_string(&snapshot.videos)?;

        let previous_profiles = self.store.load(PROFILES_KEY)?;
        self.store.save(PROFILES_KEY, &profiles)?;

        if let Err(e) = self.store.save(VIDEOS_KEY, &videos) {
            let restore = previous_profiles.as_deref().unwrap_or("[]");
            if let Err(rollback) = self.store.save(PROFILES_KEY, restore) {
                warn!("Failed to roll back cached profiles: {}", rollback);
            }
            return Err(e);
        }
        Ok(())
    }

    fn load_list<T: serde::de::DeserializeOwned>(&self, key: &str) -> Vec<T> {
        let raw = match self.store.load(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Failed to read local cache {}: {}", key, e);
                return Vec::new();
            }
        };

        // 逐条解码，跳过损坏的记录
        match serde_json::from_str::<Vec<serde_json::Value>>(&raw) {
            Ok(items) => items
                .into_iter()
                .filter_map(|item| match serde_json::from_value::<T>(item) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        warn!("Dropping corrupt cached {} entry: {}", key, e);
                        None
                    }
                })
                .collect(),
            Err(e) => {
                warn!("Local cache {} is corrupt, starting empty: {}", key, e);
                Vec::new()
            }
        }
    }
}
