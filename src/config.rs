use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub server_host: String,
    pub server_port: u16,
    pub environment: String,
    pub log_level: String,

    // Remote document store
    pub database_url: String,
    pub database_namespace: String,
    pub database_name: String,
    pub database_username: String,
    pub database_password: String,

    // Local cache
    pub local_cache_dir: String,

    // Sync and presence timers
    pub sync_interval_ms: u64,
    pub presence_interval_secs: u64,
    pub online_window_secs: i64,

    // Profile rules
    pub display_name_cooldown_days: i64,

    // Generative media service
    pub generator_url: String,
    pub generator_api_key: Option<String>,
    pub generator_timeout_secs: u64,

    // Content settings
    pub max_comment_length: usize,
    pub max_bio_length: usize,
    pub max_description_length: usize,

    // CORS configuration
    pub cors_allowed_origins: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            database_namespace: env::var("DATABASE_NAMESPACE")
                .unwrap_or_else(|_| "clipfeed".to_string()),
            database_name: env::var("DATABASE_NAME")
                .unwrap_or_else(|_| "feed".to_string()),
            database_username: env::var("DATABASE_USERNAME")
                .unwrap_or_else(|_| "root".to_string()),
            database_password: env::var("DATABASE_PASSWORD")
                .unwrap_or_else(|_| "root".to_string()),

            local_cache_dir: env::var("LOCAL_CACHE_DIR")
                .unwrap_or_else(|_| ".clipfeed".to_string()),

            sync_interval_ms: env::var("SYNC_INTERVAL_MS")
                .unwrap_or_else(|_| "4000".to_string())
                .parse()?,
            presence_interval_secs: env::var("PRESENCE_INTERVAL_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
            online_window_secs: env::var("ONLINE_WINDOW_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()?,

            display_name_cooldown_days: env::var("DISPLAY_NAME_COOLDOWN_DAYS")
                .unwrap_or_else(|_| "7".to_string())
                .parse()?,

            generator_url: env::var("GENERATOR_URL")
                .unwrap_or_else(|_| "http://localhost:8090".to_string()),
            generator_api_key: env::var("GENERATOR_API_KEY").ok(),
            generator_timeout_secs: env::var("GENERATOR_TIMEOUT_SECS")
                .unwrap_or_else(|_| "120".to_string())
                .parse()?,

            max_comment_length: env::var("MAX_COMMENT_LENGTH")
                .unwrap_or_else(|_| "500".to_string())
                .parse()?,
            max_bio_length: env::var("MAX_BIO_LENGTH")
                .unwrap_or_else(|_| "160".to_string())
                .parse()?,
            max_description_length: env::var("MAX_DESCRIPTION_LENGTH")
                .unwrap_or_else(|_| "2200".to_string())
                .parse()?,

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms.max(1))
    }

    pub fn presence_interval(&self) -> Duration {
        Duration::from_secs(self.presence_interval_secs.max(1))
    }

    pub fn online_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.online_window_secs)
    }

    pub fn display_name_cooldown(&self) -> chrono::Duration {
        chrono::Duration::days(self.display_name_cooldown_days)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 3000,
            environment: "development".to_string(),
            log_level: "info".to_string(),
            database_url: "http://localhost:8000".to_string(),
            database_namespace: "clipfeed".to_string(),
            database_name: "feed".to_string(),
            database_username: "root".to_string(),
            database_password: "root".to_string(),
            local_cache_dir: ".clipfeed".to_string(),
            sync_interval_ms: 4000,
            presence_interval_secs: 30,
            online_window_secs: 300,
            display_name_cooldown_days: 7,
            generator_url: "http://localhost:8090".to_string(),
            generator_api_key: None,
            generator_timeout_secs: 120,
            max_comment_length: 500,
            max_bio_length: 160,
            max_description_length: 2200,
            cors_allowed_origins: "http://localhost:5173".to_string(),
        }
    }
}
