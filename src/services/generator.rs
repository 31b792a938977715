use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

use crate::config::Config;
use crate::error::{AppError, Result};

/// 生成式媒体服务：根据提示词生成视频、为文本生成配文
///
/// 调用可能很慢也可能失败，这里不做重试，错误交给调用方处理。
#[async_trait]
pub trait MediaGenerator: Send + Sync {
    async fn generate_video(&self, prompt: &str) -> Result<String>;

    async fn generate_caption(&self, text: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct VideoRequest<'a> {
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct VideoResponse {
    url: String,
}

#[derive(Debug, Serialize)]
struct CaptionRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct CaptionResponse {
    caption: String,
}

#[derive(Clone)]
pub struct HttpGenerator {
    http_client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpGenerator {
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.generator_timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.generator_url.trim_end_matches('/').to_string(),
            api_key: config.generator_api_key.clone(),
        })
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized + Sync,
        R: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Calling generator: POST {}", url);

        let mut request = self.http_client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            error!("Generator request failed: {}", e);
            AppError::Generation(format!("generator unreachable: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Generation(format!(
                "generator returned {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| AppError::Generation(format!("unexpected generator response: {}", e)))
    }
}

#[async_trait]
impl MediaGenerator for HttpGenerator {
    async fn generate_video(&self, prompt: &str) -> Result<String> {
        let response: VideoResponse = self.post("/videos", &VideoRequest { prompt }).await?;
        if response.url.trim().is_empty() {
            return Err(AppError::Generation("generator returned an empty media url".to_string()));
        }
        Ok(response.url)
    }

    async fn generate_caption(&self, text: &str) -> Result<String> {
        let response: CaptionResponse = self.post("/captions", &CaptionRequest { text }).await?;
        Ok(response.caption.trim().to_string())
    }
}
