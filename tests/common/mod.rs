#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clipfeed::{
    config::Config,
    error::{AppError, Result},
    models::{Profile, Video},
    services::{
        auth::hash_password, AppController, FeedStore, LocalCache, MediaGenerator, MemoryStore,
        RemoteStore,
    },
};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub const PASSWORD: &str = "password123";

static PASSWORD_HASH: Lazy<String> = Lazy::new(|| hash_password(PASSWORD).unwrap());

/// 记录所有写入的远程存储替身
#[derive(Default)]
pub struct FakeRemote {
    pub profiles: Mutex<Value>,
    pub videos: Mutex<Value>,
    pub offline: AtomicBool,
    pub fetches: AtomicUsize,
    pub upserted_profiles: Mutex<Vec<Profile>>,
    pub upserted_videos: Mutex<Vec<Video>>,
    pub deleted_videos: Mutex<Vec<String>>,
    pub touches: Mutex<Vec<(String, DateTime<Utc>)>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self {
            profiles: Mutex::new(json!([])),
            videos: Mutex::new(json!([])),
            ..Self::default()
        }
    }

    pub fn with_payloads(profiles: Value, videos: Value) -> Self {
        let remote = Self::new();
        *remote.profiles.lock() = profiles;
        *remote.videos.lock() = videos;
        remote
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AppError::RemoteUnavailable("connection refused".to_string()));
        }
        Ok(())
    }

    pub fn touch_count(&self, username: &str) -> usize {
        self.touches.lock().iter().filter(|(u, _)| u == username).count()
    }
}

#[async_trait]
impl RemoteStore for FakeRemote {
    async fn fetch_all_profiles(&self) -> Result<Value> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        Ok(self.profiles.lock().clone())
    }

    async fn fetch_all_videos(&self) -> Result<Value> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        Ok(self.videos.lock().clone())
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        self.check_online()?;
        self.upserted_profiles.lock().push(profile.clone());
        Ok(())
    }

    async fn upsert_video(&self, video: &Video) -> Result<()> {
        self.check_online()?;
        self.upserted_videos.lock().push(video.clone());
        Ok(())
    }

    async fn delete_video(&self, id: &str) -> Result<()> {
        self.check_online()?;
        self.deleted_videos.lock().push(id.to_string());
        Ok(())
    }

    async fn touch_presence(&self, username: &str, at: DateTime<Utc>) -> Result<()> {
        self.check_online()?;
        self.touches.lock().push((username.to_string(), at));
        Ok(())
    }
}

/// 固定返回值的生成服务替身，None 表示调用失败
pub struct StubGenerator {
    pub caption: Option<String>,
    pub media_url: Option<String>,
}

#[async_trait]
impl MediaGenerator for StubGenerator {
    async fn generate_video(&self, _prompt: &str) -> Result<String> {
        self.media_url
            .clone()
            .ok_or_else(|| AppError::Generation("model overloaded".to_string()))
    }

    async fn generate_caption(&self, _text: &str) -> Result<String> {
        self.caption
            .clone()
            .ok_or_else(|| AppError::Generation("model overloaded".to_string()))
    }
}

pub struct Harness {
    pub controller: AppController,
    pub feed: FeedStore,
    pub store: MemoryStore,
    pub remote: Arc<FakeRemote>,
}

pub fn harness() -> Harness {
    harness_with_generator(StubGenerator {
        caption: Some("✨ sunset vibes".to_string()),
        media_url: Some("https://cdn.example/generated.mp4".to_string()),
    })
}

pub fn harness_with_generator(generator: StubGenerator) -> Harness {
    let store = MemoryStore::new();
    let feed = FeedStore::load(LocalCache::new(Arc::new(store.clone())));
    let remote = Arc::new(FakeRemote::new());
    let controller = AppController::new(
        Config::default(),
        feed.clone(),
        remote.clone(),
        Arc::new(generator),
    );

    Harness {
        controller,
        feed,
        store,
        remote,
    }
}

/// 直接写入一个可登录的用户，跳过注册流程的哈希开销
pub fn seed_user(feed: &FeedStore, username: &str) {
    let profile = Profile::new(
        username.to_string(),
        username.to_uppercase(),
        PASSWORD_HASH.clone(),
        Utc::now(),
    );
    feed.apply(|snap| {
        let mut next = snap.clone();
        next.upsert_profile(profile);
        Ok((next, ()))
    })
    .unwrap();
}

pub fn update_profile<F: FnOnce(&mut Profile)>(feed: &FeedStore, username: &str, f: F) {
    feed.apply(|snap| {
        let mut next = snap.clone();
        f(next.profile_mut(username).unwrap());
        Ok((next, ()))
    })
    .unwrap();
}

pub fn video_json(id: &str, owner: &str, likes: u64) -> Value {
    json!({
        "id": id,
        "username": owner,
        "mediaUrl": format!("https://cdn.example/{}.mp4", id),
        "likes": likes,
    })
}

pub fn video(id: &str, owner: &str, likes: u64) -> Video {
    serde_json::from_value(video_json(id, owner, likes)).unwrap()
}

pub fn profile(username: &str) -> Profile {
    serde_json::from_value(json!({ "username": username, "displayName": username })).unwrap()
}
