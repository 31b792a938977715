use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use validator::Validate;

use crate::utils::{ids, serde_helpers};

/// 短视频记录，id 中嵌入创建时间戳
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    /// 发布者用户名
    pub username: String,
    #[serde(default)]
    pub media_url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "serde_helpers::lenient_count::deserialize")]
    pub likes: u64,
    #[serde(default, deserialize_with = "serde_helpers::lenient_count::deserialize")]
    pub reposts: u64,
    #[serde(default, deserialize_with = "serde_helpers::lenient_count::deserialize")]
    pub views: u64,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub music: String,
    #[serde(default)]
    pub liked_by: BTreeSet<String>,
    #[serde(default)]
    pub reposted_by: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, with = "serde_helpers::millis")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub replies: Vec<Reply>,
}

/// 回复只允许一层，没有再下一级的 replies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, with = "serde_helpers::millis")]
    pub created_at: DateTime<Utc>,
}

impl Video {
    pub fn new(username: &str, media_url: String, description: String, music: String, now: DateTime<Utc>) -> Self {
        Self {
            id: ids::video_id(now),
            username: username.to_string(),
            media_url,
            description,
            likes: 0,
            reposts: 0,
            views: 0,
            comments: Vec::new(),
            music,
            liked_by: BTreeSet::new(),
            reposted_by: BTreeSet::new(),
        }
    }

    /// id 中嵌入的创建时间戳，无法解析时为 None
    pub fn created_ms(&self) -> Option<u64> {
        ids::embedded_timestamp(&self.id)
    }

    pub fn comment(&self, comment_id: &str) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == comment_id)
    }

    pub fn comment_mut(&mut self, comment_id: &str) -> Option<&mut Comment> {
        self.comments.iter_mut().find(|c| c.id == comment_id)
    }

    /// 生成在本视频内唯一的评论 ID
    pub fn fresh_comment_id(&self, now: DateTime<Utc>) -> String {
        loop {
            let id = ids::comment_id(now);
            if self.comment(&id).is_none() {
                return id;
            }
        }
    }

    pub fn total_comments(&self) -> usize {
        self.comments.iter().map(|c| 1 + c.replies.len()).sum()
    }

    pub fn matches(&self, query: &str) -> bool {
        let q = query.to_lowercase();
        self.description.to_lowercase().contains(&q)
            || self.music.to_lowercase().contains(&q)
            || self.username.to_lowercase().contains(&q)
    }
}

impl Comment {
    pub fn fresh_reply_id(&self, now: DateTime<Utc>) -> String {
        loop {
            let id = ids::reply_id(now);
            if !self.replies.iter().any(|r| r.id == id) {
                return id;
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PublishVideoRequest {
    #[validate(length(min = 1))]
    pub media_url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub music: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CommentRequest {
    #[validate(length(min = 1))]
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_video_with_replies() {
        let v: Video = serde_json::from_value(json!({
            "id": "v1700000000000-aa",
            "username": "alice",
            "mediaUrl": "https://cdn.example/a.mp4",
            "likes": 3,
            "comments": [
                {"id": "c1", "username": "bob", "text": "wow", "createdAt": 1,
                 "replies": [{"id": "r1", "username": "alice", "text": "thx"}]}
            ]
        }))
        .unwrap();

        assert_eq!(v.created_ms(), Some(1_700_000_000_000));
        assert_eq!(v.total_comments(), 2);
        assert_eq!(v.comment("c1").unwrap().replies[0].text, "thx");
        assert!(v.liked_by.is_empty());
    }

    #[test]
    fn test_missing_owner_fails() {
        let res = serde_json::from_value::<Video>(json!({"id": "v1"}));
        assert!(res.is_err());
    }

    #[test]
    fn test_matches_query() {
        let now = Utc::now();
        let v = Video::new("alice", "m".into(), "Sunset dance".into(), "Lo-fi beats".into(), now);
        assert!(v.matches("dance"));
        assert!(v.matches("LO-FI"));
        assert!(v.matches("ali"));
        assert!(!v.matches("cooking"));
    }
}
