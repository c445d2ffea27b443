//! Ollama 임베딩 프로바이더 (로컬, 오프라인)
//!
//! source: https://github.com/ollama/ollama/blob/main/docs/api.md#generate-embeddings

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{post_with_retry, EmbeddingProvider};
use crate::config::EmbeddingConfig;

/// Ollama 임베딩 구현체
#[derive(Debug)]
pub struct OllamaEmbedding {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimension: usize,
    max_retries: u32,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbedding {
    /// 설정으로 생성하고 서버 연결 확인
    ///
    /// `ollama_dimensions`가 없으면 "test" 임베딩으로 차원을 측정합니다.
    pub async fn connect(config: &EmbeddingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        let mut embedding = Self {
            client,
            base_url: config.ollama_url.trim_end_matches('/').to_string(),
            model: config.ollama_model.clone(),
            dimension: config.ollama_dimensions.unwrap_or(0),
            max_retries: config.max_retries,
        };

        if embedding.dimension == 0 {
            let sample = embedding.request(&["test".to_string()]).await?;
            embedding.dimension = sample.first().map(Vec::len).unwrap_or(0);
            if embedding.dimension == 0 {
                anyhow::bail!("Ollama returned empty embedding for model {}", embedding.model);
            }
            tracing::debug!("Detected Ollama dimension: {}", embedding.dimension);
        }

        Ok(embedding)
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            model: &self.model,
            input: texts,
        };
        let url = format!("{}/api/embed", self.base_url);

        let body = post_with_retry("Ollama", self.max_retries, || {
            self.client.post(&url).json(&request)
        })
        .await
        .with_context(|| format!("Is Ollama running at {}?", self.base_url))?;

        let response: EmbedResponse =
            serde_json::from_str(&body).context("Failed to parse Ollama embedding response")?;

        if response.embeddings.len() != texts.len() {
            anyhow::bail!(
                "Ollama returned {} embeddings for {} inputs",
                response.embeddings.len(),
                texts.len()
            );
        }

        Ok(response.embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.request(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| anyhow::anyhow!("Ollama returned empty embedding"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        self.request(texts).await
    }

    fn dimensions(&self) -> usize {
        self.dimension
    }

    fn provider_id(&self) -> &str {
        "ollama"
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
