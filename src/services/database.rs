use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use surrealdb::engine::remote::http::{Client, Http, Https};
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{Profile, Video};
use crate::services::remote::RemoteStore;
use crate::utils::serde_helpers::normalize_record_id;

pub const PROFILE_TABLE: &str = "profile";
pub const VIDEO_TABLE: &str = "video";

#[derive(Debug, Default)]
struct Readiness {
    connected: bool,
    ready: bool,
}

/// 基于 SurrealDB（HTTP 协议）的远程文档存储
///
/// 资料表 `profile` 以 username 为记录 ID，视频表 `video` 以视频 id 为记录 ID。
/// 连接是惰性的：启动时数据库不可达也能以离线模式运行，之后每次访问都会重试。
pub struct SurrealStore {
    db: Surreal<Client>,
    config: Config,
    readiness: Mutex<Readiness>,
}

impl SurrealStore {
    pub fn new(config: &Config) -> Self {
        Self {
            db: Surreal::init(),
            config: config.clone(),
            readiness: Mutex::new(Readiness::default()),
        }
    }

    /// 验证数据库连接
    pub async fn verify_connection(&self) -> Result<()> {
        self.ensure_ready().await?;
        match self.db.query("INFO FOR DB").await {
            Ok(_) => {
                info!("Database connection verified successfully");
                Ok(())
            }
            Err(e) => {
                error!("Failed to verify database connection: {}", e);
                Err(AppError::from(e))
            }
        }
    }

    async fn ensure_ready(&self) -> Result<()> {
        let mut readiness = self.readiness.lock().await;
        if readiness.ready {
            return Ok(());
        }

        if !readiness.connected {
            info!("Connecting to remote store at {}", self.config.database_url);
            let url = self.config.database_url.as_str();
            let connected = match url.strip_prefix("https://") {
                Some(address) => self.db.connect::<Https>(address).await,
                None => self.db.connect::<Http>(url.trim_start_matches("http://")).await,
            };
            connected.map_err(|e| AppError::RemoteUnavailable(e.to_string()))?;
            readiness.connected = true;
        }

        self.db
            .signin(Root {
                username: &self.config.database_username,
                password: &self.config.database_password,
            })
            .await
            .map_err(|e| AppError::RemoteUnavailable(e.to_string()))?;
        self.db
            .use_ns(self.config.database_namespace.as_str())
            .use_db(self.config.database_name.as_str())
            .await?;

        readiness.ready = true;
        Ok(())
    }

    async fn fetch_table(&self, table: &'static str) -> Result<Value> {
        self.ensure_ready().await?;
        debug!("Fetching all records from {}", table);

        let mut response = self
            .db
            .query("SELECT * FROM type::table($tb)")
            .bind(("tb", table))
            .await?;
        let rows: Vec<Value> = response.take(0)?;

        Ok(Value::Array(rows.into_iter().map(strip_record_id).collect()))
    }

    async fn put(&self, table: &'static str, id: &str, content: Value) -> Result<()> {
        self.ensure_ready().await?;
        self.db
            .query("UPDATE type::thing($tb, $id) CONTENT $data")
            .bind(("tb", table))
            .bind(("id", id.to_string()))
            .bind(("data", content))
            .await?
            .check()?;
        Ok(())
    }
}

/// 把 SurrealDB 的记录 ID 换成纯字符串 ID
fn strip_record_id(mut row: Value) -> Value {
    if let Value::Object(map) = &mut row {
        if let Some(raw) = map.remove("id") {
            if let Some(id) = normalize_record_id(&raw) {
                map.insert("id".to_string(), Value::String(id));
            }
        }
    }
    row
}

/// 记录 ID 由表和主键决定，内容里不能再带 id 字段
fn content_without_id<T: serde::Serialize>(record: &T) -> Result<Value> {
    let mut value = serde_json::to_value(record)?;
    if let Value::Object(map) = &mut value {
        map.remove("id");
    }
    Ok(value)
}

#[async_trait]
impl RemoteStore for SurrealStore {
    async fn fetch_all_profiles(&self) -> Result<Value> {
        self.fetch_table(PROFILE_TABLE).await
    }

    async fn fetch_all_videos(&self) -> Result<Value> {
        self.fetch_table(VIDEO_TABLE).await
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        let content = content_without_id(profile)?;
        self.put(PROFILE_TABLE, &profile.username, content).await
    }

    async fn upsert_video(&self, video: &Video) -> Result<()> {
        let content = content_without_id(video)?;
        self.put(VIDEO_TABLE, &video.id, content).await
    }

    async fn delete_video(&self, id: &str) -> Result<()> {
        self.ensure_ready().await?;
        self.db
            .query("DELETE type::thing($tb, $id)")
            .bind(("tb", VIDEO_TABLE))
            .bind(("id", id.to_string()))
            .await?
            .check()?;
        Ok(())
    }

    async fn touch_presence(&self, username: &str, at: DateTime<Utc>) -> Result<()> {
        self.ensure_ready().await?;
        // 只更新已有记录，不会凭空创建资料
        self.db
            .query("UPDATE type::table($tb) SET lastSeen = $ts WHERE username = $username")
            .bind(("tb", PROFILE_TABLE))
            .bind(("ts", at.timestamp_millis()))
            .bind(("username", username.to_string()))
            .await?
            .check()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_record_id() {
        let row = strip_record_id(json!({"id": "video:v100-aa", "username": "alice"}));
        assert_eq!(row["id"], json!("v100-aa"));

        let row = strip_record_id(json!({"id": {"tb": "profile", "id": {"String": "bob"}}, "username": "bob"}));
        assert_eq!(row["id"], json!("bob"));

        let row = strip_record_id(json!({"username": "carol"}));
        assert!(row.get("id").is_none());
    }

    #[test]
    fn test_content_without_id() {
        let video = Video::new("alice", "m".into(), "d".into(), "s".into(), Utc::now());
        let content = content_without_id(&video).unwrap();
        assert!(content.get("id").is_none());
        assert_eq!(content["username"], json!("alice"));
    }

    #[tokio::test]
    async fn test_unreachable_store_reports_remote_failure() {
        let config = Config {
            database_url: "http://127.0.0.1:9".to_string(),
            ..Config::default()
        };
        let store = SurrealStore::new(&config);
        let err = store.fetch_all_profiles().await.unwrap_err();
        assert!(err.is_remote_failure());
    }
}
