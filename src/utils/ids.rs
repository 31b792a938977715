use chrono::{DateTime, Utc};

/// 生成带时间戳的记录 ID，格式为 `{prefix}{毫秒时间戳}-{8位十六进制}`
///
/// 时间戳位于 ID 中第一段连续数字，排序时由 [`embedded_timestamp`] 取出。
pub fn timestamped_id(prefix: &str, now: DateTime<Utc>) -> String {
    format!(
        "{}{}-{:08x}",
        prefix,
        now.timestamp_millis().max(0),
        rand::random::<u32>()
    )
}

pub fn video_id(now: DateTime<Utc>) -> String {
    timestamped_id("v", now)
}

pub fn comment_id(now: DateTime<Utc>) -> String {
    timestamped_id("c", now)
}

pub fn reply_id(now: DateTime<Utc>) -> String {
    timestamped_id("r", now)
}

pub fn notification_id(now: DateTime<Utc>) -> String {
    timestamped_id("n", now)
}

/// 取出 ID 中第一段连续 ASCII 数字作为时间戳
///
/// 没有数字或溢出 u64 时返回 `None`。
pub fn embedded_timestamp(id: &str) -> Option<u64> {
    let start = id.find(|c: char| c.is_ascii_digit())?;
    let digits: &str = {
        let rest = &id[start..];
        let end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        &rest[..end]
    };
    digits.parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_embedded_timestamp() {
        assert_eq!(embedded_timestamp("v1700000000000-0a1b2c3d"), Some(1_700_000_000_000));
        assert_eq!(embedded_timestamp("video_300"), Some(300));
        assert_eq!(embedded_timestamp("1699999999999"), Some(1_699_999_999_999));
        assert_eq!(embedded_timestamp("abc"), None);
        assert_eq!(embedded_timestamp(""), None);
        // 超出 u64 范围
        assert_eq!(embedded_timestamp("v99999999999999999999999"), None);
    }

    #[test]
    fn test_generated_ids_embed_creation_time() {
        let now = Utc.timestamp_millis_opt(1_700_000_123_456).unwrap();
        let id = video_id(now);
        assert!(id.starts_with('v'));
        assert_eq!(embedded_timestamp(&id), Some(1_700_000_123_456));

        let c = comment_id(now);
        assert!(c.starts_with('c'));
        assert_eq!(embedded_timestamp(&c), Some(1_700_000_123_456));
    }
}
