//! OpenAI 임베딩 프로바이더
//!
//! source: https://platform.openai.com/docs/api-reference/embeddings

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{post_with_retry, EmbeddingProvider};
use crate::config::EmbeddingConfig;

const OPENAI_EMBED_URL: &str = "https://api.openai.com/v1/embeddings";

/// OpenAI 임베딩 구현체
#[derive(Debug)]
pub struct OpenAiEmbedding {
    api_key: String,
    client: reqwest::Client,
    model: String,
    dimension: usize,
    max_retries: u32,
}

impl OpenAiEmbedding {
    /// 새 인스턴스 생성
    ///
    /// # Arguments
    /// * `api_key` - OpenAI API 키
    /// * `model` - 모델 이름 (예: text-embedding-3-small)
    /// * `dimension` - 요청할 출력 차원
    pub fn new(api_key: String, model: String, dimension: usize) -> Result<Self> {
        if dimension == 0 {
            anyhow::bail!("Invalid dimension: 0");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_key,
            client,
            model,
            dimension,
            max_retries: 3,
        })
    }

    /// 설정 + 환경변수(API 키)로 생성
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = get_api_key()?;
        let mut embedding =
            Self::new(api_key, config.openai_model.clone(), config.openai_dimensions)?;
        embedding.client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;
        embedding.max_retries = config.max_retries;
        Ok(embedding)
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| anyhow::anyhow!("Empty embedding response"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let request = EmbedRequest {
            model: &self.model,
            input: texts,
            dimensions: self.dimension,
        };

        let body = post_with_retry("OpenAI", self.max_retries, || {
            self.client
                .post(OPENAI_EMBED_URL)
                .bearer_auth(&self.api_key)
                .json(&request)
        })
        .await?;

        let mut response: EmbedResponse =
            serde_json::from_str(&body).context("Failed to parse embedding response")?;

        // 응답 순서는 보장되지 않으므로 index로 정렬
        response.data.sort_by_key(|d| d.index);

        if response.data.len() != texts.len() {
            anyhow::bail!(
                "OpenAI returned {} embeddings for {} inputs",
                response.data.len(),
                texts.len()
            );
        }

        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimension
    }

    fn provider_id(&self) -> &str {
        "openai"
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// API Key Management
// ============================================================================

/// API 키 로드 (`OPENAI_API_KEY` 환경변수)
pub fn get_api_key() -> Result<String> {
    api_key_from(std::env::var("OPENAI_API_KEY").ok())
}

/// 빈 값은 미설정으로 취급
fn api_key_from(value: Option<String>) -> Result<String> {
    match value {
        Some(key) if !key.is_empty() => Ok(key),
        _ => anyhow::bail!(
            "API key not found. Set OPENAI_API_KEY environment variable.\n\
             Get your API key at: https://platform.openai.com/api-keys"
        ),
    }
}

/// API 키 존재 여부 확인
pub fn has_api_key() -> bool {
    get_api_key().is_ok()
}
