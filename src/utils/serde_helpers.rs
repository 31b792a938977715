//! 远程文档的宽松解码辅助模块
//!
//! 远程记录由不同客户端写入，字段形态并不统一（数字、数字字符串、null 都可能出现），
//! 这里集中处理这些差异，让模型结构体保持强类型。

use serde::{de::Error as _, Deserialize, Deserializer, Serializer};
use serde_json::Value;

/// 非负计数器：接受数字、数字字符串和 null，负数截断为 0
pub mod lenient_count {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(0),
            Some(Value::Number(n)) => Ok(count_from_number(&n)),
            Some(Value::String(s)) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(0);
                }
                trimmed
                    .parse::<f64>()
                    .map(clamp_float)
                    .map_err(|_| D::Error::custom(format!("invalid counter value: {}", s)))
            }
            Some(other) => Err(D::Error::custom(format!("invalid counter value: {}", other))),
        }
    }

    fn count_from_number(n: &serde_json::Number) -> u64 {
        if let Some(v) = n.as_u64() {
            v
        } else if n.as_i64().is_some() {
            0
        } else {
            n.as_f64().map(clamp_float).unwrap_or(0)
        }
    }

    fn clamp_float(f: f64) -> u64 {
        if f.is_finite() && f > 0.0 {
            f as u64
        } else {
            0
        }
    }
}

/// 毫秒时间戳（可选）：序列化为数字，反序列化接受数字、数字字符串或 RFC3339
pub mod lenient_millis {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_i64(ts.timestamp_millis()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let parsed = match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => None,
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
                .and_then(from_millis),
            Some(Value::String(s)) => match s.trim().parse::<i64>() {
                Ok(ms) => from_millis(ms),
                Err(_) => DateTime::parse_from_rfc3339(s.trim())
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc)),
            },
            // 无法识别的时间戳视为缺失，而不是让整条记录失效
            Some(_) => None,
        };
        Ok(parsed)
    }

    fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(ms).single()
    }
}

/// 必填毫秒时间戳，缺失时使用 UNIX 纪元
pub mod millis {
    use super::*;
    use chrono::{DateTime, Utc};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(value.timestamp_millis())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(lenient_millis::deserialize(deserializer)?.unwrap_or_default())
    }
}

/// 将 SurrealDB 的记录 ID（字符串 "table:id" 或 {tb, id} 对象）规范化为纯 ID
pub fn normalize_record_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let raw = match s.split_once(':') {
                Some((_, id)) => id,
                None => s.as_str(),
            };
            let cleaned = raw
                .trim_start_matches('⟨')
                .trim_end_matches('⟩')
                .trim_matches('`');
            if cleaned.is_empty() {
                None
            } else {
                Some(cleaned.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => {
            if let Some(id) = map.get("id") {
                return normalize_record_id(id);
            }
            // 枚举形式的 ID，例如 {"String": "abc"}
            map.get("String")
                .or_else(|| map.get("Number"))
                .and_then(normalize_record_id)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Counter {
        #[serde(default, deserialize_with = "lenient_count::deserialize")]
        n: u64,
    }

    #[derive(Deserialize)]
    struct Stamp {
        #[serde(default, with = "lenient_millis")]
        at: Option<DateTime<Utc>>,
    }

    fn count(v: serde_json::Value) -> u64 {
        serde_json::from_value::<Counter>(v).unwrap().n
    }

    #[test]
    fn test_lenient_count() {
        assert_eq!(count(json!({"n": 5})), 5);
        assert_eq!(count(json!({"n": -3})), 0);
        assert_eq!(count(json!({"n": "12"})), 12);
        assert_eq!(count(json!({"n": null})), 0);
        assert_eq!(count(json!({})), 0);
        assert_eq!(count(json!({"n": 2.9})), 2);
        assert!(serde_json::from_value::<Counter>(json!({"n": "many"})).is_err());
        assert!(serde_json::from_value::<Counter>(json!({"n": [1]})).is_err());
    }

    #[test]
    fn test_lenient_millis() {
        let s: Stamp = serde_json::from_value(json!({"at": 1_700_000_000_000i64})).unwrap();
        assert_eq!(s.at.unwrap().timestamp_millis(), 1_700_000_000_000);

        let s: Stamp = serde_json::from_value(json!({"at": "1700000000000"})).unwrap();
        assert_eq!(s.at.unwrap().timestamp_millis(), 1_700_000_000_000);

        let s: Stamp = serde_json::from_value(json!({"at": "2024-01-01T00:00:00Z"})).unwrap();
        assert!(s.at.is_some());

        let s: Stamp = serde_json::from_value(json!({"at": {"weird": true}})).unwrap();
        assert!(s.at.is_none());

        let s: Stamp = serde_json::from_value(json!({})).unwrap();
        assert!(s.at.is_none());
    }

    #[test]
    fn test_normalize_record_id() {
        assert_eq!(normalize_record_id(&json!("video:v100-ab")), Some("v100-ab".to_string()));
        assert_eq!(normalize_record_id(&json!("profile:⟨alice⟩")), Some("alice".to_string()));
        assert_eq!(normalize_record_id(&json!("alice")), Some("alice".to_string()));
        assert_eq!(
            normalize_record_id(&json!({"tb": "profile", "id": {"String": "bob"}})),
            Some("bob".to_string())
        );
        assert_eq!(normalize_record_id(&json!({"tb": "video", "id": 42})), Some("42".to_string()));
        assert_eq!(normalize_record_id(&json!(null)), None);
        assert_eq!(normalize_record_id(&json!("video:")), None);
    }
}
