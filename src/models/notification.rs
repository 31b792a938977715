use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::{ids, serde_helpers};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(default)]
    pub kind: NotificationKind,
    /// 触发通知的用户
    #[serde(default)]
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default, with = "serde_helpers::millis")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Follow,
    Like,
    Comment,
    Reply,
    Repost,
    Moderation,
    #[default]
    #[serde(other)]
    Other,
}

impl Notification {
    pub fn new(
        kind: NotificationKind,
        from: &str,
        video_id: Option<&str>,
        text: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ids::notification_id(now),
            kind,
            from: from.to_string(),
            video_id: video_id.map(str::to_string),
            text,
            created_at: now,
            read: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_kind_decodes_as_other() {
        let n: Notification = serde_json::from_value(json!({
            "id": "n1",
            "kind": "gift",
            "from": "bob",
            "text": "sent you a gift",
            "createdAt": 1_700_000_000_000i64
        }))
        .unwrap();
        assert_eq!(n.kind, NotificationKind::Other);
        assert!(!n.read);
        assert_eq!(n.created_at.timestamp_millis(), 1_700_000_000_000);
    }
}
