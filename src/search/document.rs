//! 문서 하나에 대한 전수(brute-force) 유사도 검색

use std::cmp::Ordering;
use std::sync::Arc;

use crate::config::SearchConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::knowledge::{
    cosine_similarity, DocumentDescriptor, KnowledgeBase, KnowledgeBaseMetadata,
    KnowledgeBaseStore, ProviderMismatch, SearchResult,
};

/// 문서별 검색 엔진
///
/// 로드된 지식베이스는 엔진 수명 동안 읽기 전용입니다.
pub struct DocumentSearchEngine {
    name: String,
    knowledge_base: KnowledgeBase,
    provider: Arc<dyn EmbeddingProvider>,
    threshold: f32,
    top_k: usize,
    provider_mismatch: Option<ProviderMismatch>,
}

impl DocumentSearchEngine {
    /// 캐시 파일을 로드해 엔진 생성
    pub fn open(
        descriptor: &DocumentDescriptor,
        provider: Arc<dyn EmbeddingProvider>,
        options: &SearchConfig,
    ) -> Result<Self> {
        let loaded = KnowledgeBaseStore::load(&descriptor.cache_path, provider.as_ref())?;

        let mut engine = Self::from_knowledge_base(
            descriptor.display_name(),
            loaded.knowledge_base,
            provider,
            options,
        );
        engine.provider_mismatch = loaded.provider_mismatch;
        Ok(engine)
    }

    pub fn from_knowledge_base(
        name: impl Into<String>,
        knowledge_base: KnowledgeBase,
        provider: Arc<dyn EmbeddingProvider>,
        options: &SearchConfig,
    ) -> Self {
        Self {
            name: name.into(),
            knowledge_base,
            provider,
            threshold: options.threshold,
            top_k: options.top_k,
            provider_mismatch: None,
        }
    }

    /// 쿼리 임베딩 후 상위 `top_k` 결과
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        let query_vector = self
            .provider
            .embed(query)
            .await
            .map_err(RagError::Embedding)?;

        self.rank(&query_vector, top_k)
    }

    /// 기본 `top_k`로 검색
    pub async fn search_default(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.search(query, self.top_k).await
    }

    /// 이미 임베딩된 쿼리 벡터로 순위 매기기
    ///
    /// 점수가 임계값보다 큰 청크만, 점수 내림차순(동점은 ID 오름차순).
    pub fn rank(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        let metadata = &self.knowledge_base.metadata;
        if query_vector.len() != metadata.dimensions {
            return Err(RagError::DimensionMismatch {
                query_dimensions: query_vector.len(),
                expected_dimensions: metadata.dimensions,
                built_with: metadata.identity(),
                active: self.provider.identity(),
            });
        }

        let mut scored: Vec<(f32, u32, usize)> = self
            .knowledge_base
            .chunks
            .iter()
            .enumerate()
            .map(|(idx, chunk)| (cosine_similarity(query_vector, &chunk.vector), chunk.id, idx))
            .filter(|(score, _, _)| *score > self.threshold)
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.1.cmp(&b.1))
        });
        scored.truncate(top_k);

        tracing::debug!("{}: {} chunks above threshold", self.name, scored.len());

        Ok(scored
            .into_iter()
            .map(|(score, _, idx)| {
                let chunk = &self.knowledge_base.chunks[idx];
                SearchResult {
                    text: chunk.content.clone(),
                    page: chunk.page_number,
                    score,
                    source_document: self.name.clone(),
                }
            })
            .collect())
    }

    /// 페이지의 청크 내용을 줄바꿈으로 연결 (청크가 없으면 None)
    pub fn read_page(&self, page: u32) -> Option<String> {
        self.knowledge_base.page_text(page)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metadata(&self) -> &KnowledgeBaseMetadata {
        &self.knowledge_base.metadata
    }

    pub fn chunk_count(&self) -> usize {
        self.knowledge_base.chunks.len()
    }

    pub fn page_numbers(&self) -> Vec<u32> {
        self.knowledge_base.page_numbers()
    }

    pub fn provider_mismatch(&self) -> Option<&ProviderMismatch> {
        self.provider_mismatch.as_ref()
    }
}

// ============================================================================
// Tests
// ============================================================================
