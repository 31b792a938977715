//! 本地缓存与远程数据的合并
//!
//! 规则：以本地集合为起点，远程记录按主键插入或覆盖（远程优先），
//! 仅存在于本地的记录保留。视频合并后按 id 中的时间戳倒序排列，
//! 无法解析时间戳的视频排在最后，同时间戳按 id 升序。
//!
//! 所有函数都是纯函数，不修改输入。

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use crate::models::{FeedSnapshot, Profile, Video};
use crate::utils::ids::embedded_timestamp;

pub fn merge_profiles(
    local: &BTreeMap<String, Profile>,
    remote: &[Profile],
) -> BTreeMap<String, Profile> {
    let mut merged = local.clone();
    for profile in remote {
        merged.insert(profile.username.clone(), profile.clone());
    }
    merged
}

pub fn merge_videos(local: &[Video], remote: &[Video]) -> Vec<Video> {
    let mut by_id: HashMap<&str, &Video> = HashMap::with_capacity(local.len() + remote.len());
    for video in local.iter().chain(remote.iter()) {
        by_id.insert(video.id.as_str(), video);
    }

    let mut merged: Vec<Video> = by_id.into_values().cloned().collect();
    sort_videos(&mut merged);
    merged
}

/// 合并整个快照，返回新快照
pub fn merge_snapshot(local: &FeedSnapshot, remote_profiles: &[Profile], remote_videos: &[Video]) -> FeedSnapshot {
    FeedSnapshot {
        profiles: merge_profiles(&local.profiles, remote_profiles),
        videos: merge_videos(&local.videos, remote_videos),
    }
}

pub fn sort_videos(videos: &mut [Video]) {
    videos.sort_by(compare_videos);
}

fn compare_videos(a: &Video, b: &Video) -> Ordering {
    let by_time = match (embedded_timestamp(&a.id), embedded_timestamp(&b.id)) {
        (Some(ta), Some(tb)) => tb.cmp(&ta),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_time.then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn video(id: &str, likes: u64) -> Video {
        let mut v = Video::new("alice", "m".into(), String::new(), String::new(), Utc::now());
        v.id = id.to_string();
        v.likes = likes;
        v
    }

    fn profile(username: &str, followers: u64) -> Profile {
        let mut p = Profile::new(username.into(), username.into(), "h".into(), Utc::now());
        p.followers = followers;
        p
    }

    #[test]
    fn test_scenario_remote_wins_and_sorted() {
        let local = vec![video("v100", 0), video("v200", 0)];
        let remote = vec![video("v200", 5), video("v300", 0)];

        let merged = merge_videos(&local, &remote);
        let ids: Vec<_> = merged.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["v300", "v200", "v100"]);
        assert_eq!(merged[1].likes, 5);
    }

    #[test]
    fn test_empty_remote_keeps_local() {
        let mut local = BTreeMap::new();
        local.insert("alice".to_string(), profile("alice", 3));
        let merged = merge_profiles(&local, &[]);
        assert_eq!(merged, local);
    }

    #[test]
    fn test_remote_overwrites_profile() {
        let mut local = BTreeMap::new();
        local.insert("alice".to_string(), profile("alice", 3));
        local.insert("bob".to_string(), profile("bob", 1));

        let merged = merge_profiles(&local, &[profile("alice", 8), profile("carol", 0)]);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged["alice"].followers, 8);
        assert_eq!(merged["bob"].followers, 1);
        // 输入未被修改
        assert_eq!(local["alice"].followers, 3);
    }

    #[test]
    fn test_unparsable_ids_sort_last() {
        let merged = merge_videos(&[video("draft", 0), video("v5", 0)], &[video("abc", 0), video("v9", 0)]);
        let ids: Vec<_> = merged.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["v9", "v5", "abc", "draft"]);
    }

    #[test]
    fn test_duplicate_remote_ids_collapse() {
        let merged = merge_videos(&[video("v1", 1)], &[video("v1", 2), video("v1", 3)]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].likes, 3);
    }
}
