use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{
    profile::{Profile, ProfileView},
    video::Video,
};
use crate::services::merge;

/// 客户端工作集的不可变快照
///
/// 每次同步或用户操作都会产生新的快照，旧快照保持不变。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedSnapshot {
    pub profiles: BTreeMap<String, Profile>,
    /// 按创建时间倒序
    pub videos: Vec<Video>,
}

impl FeedSnapshot {
    pub fn new(profiles: BTreeMap<String, Profile>, mut videos: Vec<Video>) -> Self {
        merge::sort_videos(&mut videos);
        Self { profiles, videos }
    }

    pub fn profile(&self, username: &str) -> Option<&Profile> {
        self.profiles.get(username)
    }

    pub fn profile_mut(&mut self, username: &str) -> Option<&mut Profile> {
        self.profiles.get_mut(username)
    }

    pub fn video(&self, id: &str) -> Option<&Video> {
        self.videos.iter().find(|v| v.id == id)
    }

    pub fn video_mut(&mut self, id: &str) -> Option<&mut Video> {
        self.videos.iter_mut().find(|v| v.id == id)
    }

    pub fn upsert_profile(&mut self, profile: Profile) {
        self.profiles.insert(profile.username.clone(), profile);
    }

    /// 插入或替换视频，并保持排序
    pub fn upsert_video(&mut self, video: Video) {
        match self.videos.iter_mut().find(|v| v.id == video.id) {
            Some(existing) => *existing = video,
            None => {
                self.videos.push(video);
                merge::sort_videos(&mut self.videos);
            }
        }
    }

    pub fn remove_video(&mut self, id: &str) -> Option<Video> {
        let idx = self.videos.iter().position(|v| v.id == id)?;
        Some(self.videos.remove(idx))
    }

    pub fn videos_by(&self, username: &str) -> Vec<Video> {
        self.videos
            .iter()
            .filter(|v| v.username == username)
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty() && self.videos.is_empty()
    }
}

/// 发现页结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discover {
    pub videos: Vec<Video>,
    pub profiles: Vec<ProfileView>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn video(id: &str, owner: &str) -> Video {
        let mut v = Video::new(owner, "m".into(), String::new(), String::new(), Utc::now());
        v.id = id.to_string();
        v
    }

    #[test]
    fn test_upsert_video_keeps_order() {
        let mut snap = FeedSnapshot::new(BTreeMap::new(), vec![video("v100", "a"), video("v300", "b")]);
        snap.upsert_video(video("v200", "c"));

        let ids: Vec<_> = snap.videos.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["v300", "v200", "v100"]);

        let mut replaced = video("v200", "c");
        replaced.likes = 9;
        snap.upsert_video(replaced);
        assert_eq!(snap.videos.len(), 3);
        assert_eq!(snap.video("v200").unwrap().likes, 9);
    }

    #[test]
    fn test_remove_and_filter() {
        let mut snap = FeedSnapshot::new(BTreeMap::new(), vec![video("v1", "a"), video("v2", "b"), video("v3", "a")]);
        assert_eq!(snap.videos_by("a").len(), 2);
        assert!(snap.remove_video("v1").is_some());
        assert!(snap.remove_video("v1").is_none());
        assert_eq!(snap.videos_by("a").len(), 1);
    }
}
