//! 지식베이스 데이터 모델
//!
//! JSON 필드명은 기존 캐시 파일과 호환되도록 camelCase를 사용합니다.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::cache;

/// 임베딩된 문단 단위 청크
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// 문서 내 순차 ID
    pub id: u32,
    /// 페이지 번호 (PDF 물리 페이지 또는 텍스트 윈도우 번호)
    pub page_number: u32,
    pub content: String,
    pub vector: Vec<f32>,
}

/// 지식베이스 생성 정보
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBaseMetadata {
    #[serde(rename = "provider")]
    pub provider_id: String,
    #[serde(rename = "modelName")]
    pub model_id: String,
    pub dimensions: usize,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl KnowledgeBaseMetadata {
    /// `provider/model` 형식 식별자
    pub fn identity(&self) -> String {
        format!("{}/{}", self.provider_id, self.model_id)
    }
}

/// 문서 하나의 지식베이스 (메타데이터 + 청크)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub metadata: KnowledgeBaseMetadata,
    pub chunks: Vec<Chunk>,
}

impl KnowledgeBase {
    /// 특정 페이지의 청크 (ID 순)
    pub fn page(&self, page_number: u32) -> Vec<&Chunk> {
        page_chunks(&self.chunks, page_number)
    }

    /// 페이지의 청크 내용을 줄바꿈으로 연결 (청크가 없으면 None)
    pub fn page_text(&self, page_number: u32) -> Option<String> {
        page_text(&self.chunks, page_number)
    }

    /// 청크가 존재하는 페이지 번호 (오름차순, 중복 제거)
    pub fn page_numbers(&self) -> Vec<u32> {
        let mut pages: Vec<u32> = self.chunks.iter().map(|c| c.page_number).collect();
        pages.sort_unstable();
        pages.dedup();
        pages
    }

    /// 모든 청크 벡터 길이가 메타데이터 차원과 같은지
    pub fn is_consistent(&self) -> bool {
        self.chunks
            .iter()
            .all(|c| c.vector.len() == self.metadata.dimensions)
    }
}

fn page_chunks(chunks: &[Chunk], page_number: u32) -> Vec<&Chunk> {
    let mut page: Vec<&Chunk> = chunks
        .iter()
        .filter(|c| c.page_number == page_number)
        .collect();
    page.sort_by_key(|c| c.id);
    page
}

/// 청크 목록에서 한 페이지의 텍스트 조합
pub fn page_text(chunks: &[Chunk], page_number: u32) -> Option<String> {
    let page = page_chunks(chunks, page_number);
    if page.is_empty() {
        return None;
    }
    Some(
        page.iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

/// 검색 결과 (쿼리마다 새로 생성)
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub text: String,
    pub page: u32,
    /// 코사인 유사도
    pub score: f32,
    /// 출처 문서 표시 이름
    pub source_document: String,
}

/// 원본 문서 경로와 캐시 경로 쌍
///
/// 저장하지 않고 프로바이더가 바뀔 때마다 다시 계산합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentDescriptor {
    pub file_path: PathBuf,
    pub cache_path: PathBuf,
}

impl DocumentDescriptor {
    pub fn new(file_path: &Path, cache_dir: &Path, provider_id: &str) -> Self {
        Self {
            file_path: file_path.to_path_buf(),
            cache_path: cache::derive(cache_dir, file_path, provider_id),
        }
    }

    /// 표시 이름 (확장자 제외 파일명)
    pub fn display_name(&self) -> String {
        self.file_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.file_path.display().to_string())
    }

    pub fn is_cached(&self) -> bool {
        self.cache_path.is_file()
    }
}
