//! 에러 타입 정의
//!
//! 수집 파이프라인과 검색 엔진이 반환하는 에러 분류입니다.
//! 프로바이더 불일치(경고)와 문서별 로드 실패(건너뜀)는 에러가 아니므로
//! 여기에 포함되지 않습니다. `ProviderMismatch`, `SkippedDocument` 참고.

use std::path::PathBuf;

use thiserror::Error;

use crate::collector::SUPPORTED_EXTENSIONS;

/// 라이브러리 에러
#[derive(Debug, Error)]
pub enum RagError {
    /// 지식베이스 파일 없음 (수집이 먼저 필요)
    #[error("Knowledge base not found: {}. Run ingestion first.", .0.display())]
    NotFound(PathBuf),

    /// 지원하지 않는 파일 형식
    #[error(
        "File format '{extension}' is not supported. Supported formats: {}",
        supported_formats()
    )]
    UnsupportedFormat { extension: String },

    /// 정규 스키마와 레거시 스키마 모두 파싱 실패
    #[error(
        "Invalid knowledge base format: {} (canonical: {canonical}; legacy: {legacy})",
        path.display()
    )]
    InvalidFormat {
        path: PathBuf,
        canonical: String,
        legacy: String,
    },

    /// 쿼리 벡터 차원이 지식베이스와 다름
    #[error(
        "Dimension mismatch! Query vector is {query_dimensions}D but knowledge base expects {expected_dimensions}D.\n\
         Knowledge base was created with: {built_with}\n\
         Current provider: {active}\n\
         Please rebuild the knowledge base with the current embedding provider."
    )]
    DimensionMismatch {
        query_dimensions: usize,
        expected_dimensions: usize,
        /// `provider/model` (지식베이스 생성 시)
        built_with: String,
        /// `provider/model` (현재 활성)
        active: String,
    },

    /// 수집 중 배치 임베딩 실패 (Abort 정책)
    #[error("Embedding batch {batch} failed after {attempts} attempt(s): {message}")]
    BatchEmbeddingFailure {
        batch: usize,
        attempts: u32,
        message: String,
    },

    /// 쿼리 임베딩 실패
    #[error("Embedding provider failed: {0:#}")]
    Embedding(anyhow::Error),

    /// 텍스트 추출 실패
    #[error("Failed to extract text from {}: {message}", path.display())]
    Extraction { path: PathBuf, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RagError>;

fn supported_formats() -> String {
    SUPPORTED_EXTENSIONS
        .iter()
        .map(|ext| format!(".{}", ext))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_format_lists_allowed_set() {
        let err = RagError::UnsupportedFormat {
            extension: ".docx".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains(".docx"));
        assert!(msg.contains(".pdf, .txt, .md, .json"));
    }

    #[test]
    fn test_dimension_mismatch_names_both_models() {
        let err = RagError::DimensionMismatch {
            query_dimensions: 768,
            expected_dimensions: 512,
            built_with: "openai/text-embedding-3-small".to_string(),
            active: "ollama/nomic-embed-text".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("768D"));
        assert!(msg.contains("512D"));
        assert!(msg.contains("openai/text-embedding-3-small"));
        assert!(msg.contains("ollama/nomic-embed-text"));
    }
}
