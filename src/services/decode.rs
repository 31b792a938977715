//! 远程数据的解码与校验
//!
//! 每个远程载荷在进入合并前都先经过这里：载荷必须是数组，
//! 单条记录解码失败或主键缺失时跳过该条，其余记录照常处理。

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::error::AppError;
use crate::models::{Profile, Video};

#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("{kind} payload is not an array (got {found})")]
    NotAnArray { kind: &'static str, found: &'static str },
}

impl From<DecodeError> for AppError {
    fn from(err: DecodeError) -> Self {
        AppError::Decode(err.to_string())
    }
}

/// 可以从远程载荷解码的记录
pub trait RemoteRecord: DeserializeOwned {
    const KIND: &'static str;

    fn key(&self) -> &str;

    /// 解码后的额外校验，返回拒绝原因
    fn check(&self) -> std::result::Result<(), String> {
        if self.key().trim().is_empty() {
            return Err(format!("{} with empty key", Self::KIND));
        }
        Ok(())
    }
}

impl RemoteRecord for Profile {
    const KIND: &'static str = "profile";

    fn key(&self) -> &str {
        &self.username
    }
}

impl RemoteRecord for Video {
    const KIND: &'static str = "video";

    fn key(&self) -> &str {
        &self.id
    }

    fn check(&self) -> std::result::Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("video with empty id".to_string());
        }
        if self.username.trim().is_empty() {
            return Err(format!("video {} without owner", self.id));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Decoded<T> {
    pub records: Vec<T>,
    pub skipped: usize,
}

pub fn decode_batch<T: RemoteRecord>(payload: Value) -> std::result::Result<Decoded<T>, DecodeError> {
    let items = match payload {
        Value::Array(items) => items,
        other => {
            return Err(DecodeError::NotAnArray {
                kind: T::KIND,
                found: json_type_name(&other),
            })
        }
    };

    let mut records = Vec::with_capacity(items.len());
    let mut skipped = 0;

    for (index, item) in items.into_iter().enumerate() {
        let decoded = serde_json::from_value::<T>(item)
            .map_err(|e| e.to_string())
            .and_then(|record| record.check().map(|_| record));

        match decoded {
            Ok(record) => records.push(record),
            Err(reason) => {
                skipped += 1;
                warn!("Skipping malformed {} record #{}: {}", T::KIND, index, reason);
            }
        }
    }

    Ok(Decoded { records, skipped })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_non_array_payload_rejected() {
        let err = decode_batch::<Profile>(json!({"alice": {"username": "alice"}})).unwrap_err();
        assert_eq!(err, DecodeError::NotAnArray { kind: "profile", found: "object" });

        assert!(decode_batch::<Video>(Value::Null).is_err());
    }

    #[test]
    fn test_malformed_records_skipped() {
        let decoded = decode_batch::<Video>(json!([
            {"id": "v1", "username": "alice"},
            {"id": "v2"},
            {"username": "bob"},
            {"id": "", "username": "bob"},
            {"id": "v3", "username": "  "},
            "garbage",
            {"id": "v4", "username": "carol", "likes": "7"}
        ]))
        .unwrap();

        let ids: Vec<_> = decoded.records.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["v1", "v4"]);
        assert_eq!(decoded.skipped, 5);
        assert_eq!(decoded.records[1].likes, 7);
    }

    #[test]
    fn test_empty_array() {
        let decoded = decode_batch::<Profile>(json!([])).unwrap();
        assert!(decoded.records.is_empty());
        assert_eq!(decoded.skipped, 0);
    }
}
