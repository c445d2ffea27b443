//! 설정 모듈
//!
//! 캐시 디렉토리, 임베딩 프로바이더, 검색/수집 파라미터를 하나의
//! [`AppConfig`]로 묶어 생성자에 명시적으로 전달합니다.
//! 저장 위치: `<config_dir>/docvec/config.json` (없으면 기본값)

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::embedding::ProviderKind;
use crate::ingest::BatchFailurePolicy;

// ============================================================================
// Directories
// ============================================================================

/// 설정 파일 경로
pub fn get_config_path() -> PathBuf {
    dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docvec")
        .join("config.json")
}

/// 기본 캐시 디렉토리
pub fn get_cache_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docvec")
        .join("cache")
}

// ============================================================================
// Config Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    /// 지식베이스 JSON 캐시 디렉토리 (프로세스 전역 하나)
    pub cache_dir: PathBuf,
    pub embedding: EmbeddingConfig,
    pub search: SearchConfig,
    pub ingest: IngestConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_dir: get_cache_dir(),
            embedding: EmbeddingConfig::default(),
            search: SearchConfig::default(),
            ingest: IngestConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmbeddingConfig {
    pub provider: ProviderKind,
    pub openai_model: String,
    pub openai_dimensions: usize,
    pub ollama_model: String,
    pub ollama_url: String,
    /// None이면 연결 시 측정
    pub ollama_dimensions: Option<usize>,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            openai_model: "text-embedding-3-small".to_string(),
            openai_dimensions: 512,
            ollama_model: "nomic-embed-text".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            ollama_dimensions: None,
            timeout_secs: 300,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchConfig {
    /// 관련도 컷오프 (이 값보다 커야 결과에 포함)
    pub threshold: f32,
    /// 문서별 최대 결과 수
    pub top_k: usize,
    /// 다중 문서 통합 최대 결과 수
    pub aggregate_top_k: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            threshold: 0.45,
            top_k: 5,
            aggregate_top_k: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IngestConfig {
    /// 텍스트 파일 윈도우 크기 (문자 수)
    pub window_size: usize,
    /// 최소 청크 길이 (문자 수)
    pub min_chunk_chars: usize,
    pub batch_size: usize,
    pub batch_policy: BatchFailurePolicy,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            window_size: 2000,
            min_chunk_chars: 30,
            batch_size: 10,
            batch_policy: BatchFailurePolicy::default(),
        }
    }
}

// ============================================================================
// Load / Save
// ============================================================================

impl AppConfig {
    /// 기본 위치에서 로드 (파일이 없으면 기본값)
    pub fn load() -> Result<Self> {
        Self::load_from(&get_config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        let config = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse config: {:?}", path))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&get_config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, json).with_context(|| format!("Failed to write config: {:?}", path))?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.search.threshold, 0.45);
        assert_eq!(config.search.top_k, 5);
        assert_eq!(config.search.aggregate_top_k, 10);
        assert_eq!(config.ingest.window_size, 2000);
        assert_eq!(config.ingest.batch_size, 10);
        assert_eq!(config.ingest.min_chunk_chars, 30);
        assert_eq!(config.embedding.provider, ProviderKind::OpenAi);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.search.top_k, 5);
    }

    #[test]
    fn test_partial_file_and_batch_policy() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"search": {"topK": 3}, "ingest": {"batchPolicy": {"mode": "abort"}}}"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.search.top_k, 3);
        assert_eq!(config.search.threshold, 0.45);
        assert_eq!(config.ingest.batch_policy, BatchFailurePolicy::Abort);
        assert_eq!(
            AppConfig::default().ingest.batch_policy,
            BatchFailurePolicy::Retry { attempts: 3 }
        );
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = AppConfig::default();
        config.cache_dir = dir.path().join("cache");
        config.embedding.provider = ProviderKind::Ollama;
        config.search.threshold = 0.6;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.cache_dir, config.cache_dir);
        assert_eq!(loaded.embedding.provider, ProviderKind::Ollama);
        assert_eq!(loaded.search.threshold, 0.6);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "search": { "topK": 3 } }"#).unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.search.top_k, 3);
        assert_eq!(config.search.aggregate_top_k, 10);
        assert_eq!(config.ingest.batch_size, 10);
    }
}
