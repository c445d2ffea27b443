//! 임베딩 모듈 - 텍스트 벡터화 프로바이더
//!
//! 수집 파이프라인과 검색 엔진은 [`EmbeddingProvider`] 트레이트만 사용합니다.
//! 실제 프로바이더는 닫힌 열거형 [`Embedder`]로 선택합니다.
//!
//! ## 사용법
//! ```rust,ignore
//! let embedder = Embedder::connect(&config.embedding).await?;
//! let embedding = embedder.embed("Hello, world!").await?;
//! ```

mod ollama;
mod openai;

#[cfg(test)]
pub(crate) mod testing;

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::EmbeddingConfig;

pub use ollama::OllamaEmbedding;
pub use openai::{get_api_key, has_api_key, OpenAiEmbedding};

// ============================================================================
// EmbeddingProvider Trait
// ============================================================================

/// 임베딩 프로바이더 트레이트
///
/// 텍스트를 고정 차원 벡터로 변환하는 인터페이스입니다.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// 단일 텍스트 임베딩
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// 배치 임베딩 (기본 구현: 순차 호출)
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// 임베딩 차원 수
    fn dimensions(&self) -> usize;

    /// 프로바이더 ID (캐시 파일명에 사용, 예: "openai")
    fn provider_id(&self) -> &str;

    /// 모델 ID (예: "text-embedding-3-small")
    fn model_id(&self) -> &str;

    /// `provider/model` 형식 식별자
    fn identity(&self) -> String {
        format!("{}/{}", self.provider_id(), self.model_id())
    }
}

// ============================================================================
// Provider Selection
// ============================================================================

/// 프로바이더 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI Embeddings API
    #[default]
    #[value(name = "openai")]
    OpenAi,
    /// 로컬 Ollama 서버
    Ollama,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Ollama => "ollama",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 설정으로 선택되는 임베딩 프로바이더
#[derive(Debug)]
pub enum Embedder {
    OpenAi(OpenAiEmbedding),
    Ollama(OllamaEmbedding),
}

impl Embedder {
    /// 설정에 따라 프로바이더 생성
    ///
    /// Ollama는 차원이 설정되지 않은 경우 테스트 임베딩으로 차원을 알아냅니다.
    pub async fn connect(config: &EmbeddingConfig) -> Result<Self> {
        let embedder = match config.provider {
            ProviderKind::OpenAi => Embedder::OpenAi(OpenAiEmbedding::from_config(config)?),
            ProviderKind::Ollama => Embedder::Ollama(
                OllamaEmbedding::connect(config)
                    .await
                    .context("Failed to connect to Ollama")?,
            ),
        };

        tracing::info!(
            "Using {} embeddings (dimension: {})",
            embedder.identity(),
            embedder.dimensions()
        );
        Ok(embedder)
    }
}

#[async_trait]
impl EmbeddingProvider for Embedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        match self {
            Embedder::OpenAi(p) => p.embed(text).await,
            Embedder::Ollama(p) => p.embed(text).await,
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        match self {
            Embedder::OpenAi(p) => p.embed_batch(texts).await,
            Embedder::Ollama(p) => p.embed_batch(texts).await,
        }
    }

    fn dimensions(&self) -> usize {
        match self {
            Embedder::OpenAi(p) => p.dimensions(),
            Embedder::Ollama(p) => p.dimensions(),
        }
    }

    fn provider_id(&self) -> &str {
        match self {
            Embedder::OpenAi(p) => p.provider_id(),
            Embedder::Ollama(p) => p.provider_id(),
        }
    }

    fn model_id(&self) -> &str {
        match self {
            Embedder::OpenAi(p) => p.model_id(),
            Embedder::Ollama(p) => p.model_id(),
        }
    }
}

// ============================================================================
// HTTP Retry
// ============================================================================

/// 재시도 시 초기 백오프 (ms)
const INITIAL_BACKOFF_MS: u64 = 1000;

/// JSON POST 요청을 보내고 응답 본문을 반환
///
/// 429와 5xx, 네트워크 에러는 지수 백오프로 재시도합니다.
/// 그 외 4xx는 즉시 실패합니다.
pub(crate) async fn post_with_retry<F>(
    label: &str,
    max_retries: u32,
    make_request: F,
) -> Result<String>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut last_error: Option<anyhow::Error> = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let backoff = Duration::from_millis(INITIAL_BACKOFF_MS * 2u64.pow((attempt - 1).min(5)));
            tracing::warn!(
                "{} request failed, retrying in {:?} (attempt {}/{})",
                label,
                backoff,
                attempt,
                max_retries
            );
            tokio::time::sleep(backoff).await;
        }

        let response = match make_request().send().await {
            Ok(resp) => resp,
            Err(e) => {
                last_error = Some(anyhow::anyhow!("Failed to send {} request: {}", label, e));
                continue;
            }
        };

        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read {} response body", label))?;

        if status.is_success() {
            return Ok(body);
        }

        if status.as_u16() == 429 || status.is_server_error() {
            last_error = Some(anyhow::anyhow!("{} API error ({}): {}", label, status, body));
            continue;
        }

        anyhow::bail!("{} API error ({}): {}", label, status, body);
    }

    Err(last_error
        .unwrap_or_else(|| anyhow::anyhow!("{} request failed after {} retries", label, max_retries)))
}

// ============================================================================
// Tests
// ============================================================================
