//! 여러 문서 동시 검색 + 결과 병합

use std::cmp::Ordering;
use std::sync::Arc;

use futures::future::try_join_all;

use super::document::DocumentSearchEngine;
use crate::config::SearchConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::knowledge::{DocumentDescriptor, SearchResult};

/// 로드에서 제외된 문서
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDocument {
    pub name: String,
    pub reason: String,
}

/// 로드 결과 요약
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: Vec<SkippedDocument>,
}

/// 다중 문서 검색 엔진
///
/// 문서별 엔진을 로드 순서대로 보관합니다.
pub struct MultiDocumentSearchEngine {
    engines: Vec<DocumentSearchEngine>,
    options: SearchConfig,
}

impl MultiDocumentSearchEngine {
    pub fn new(options: SearchConfig) -> Self {
        Self {
            engines: Vec::new(),
            options,
        }
    }

    /// 문서별 엔진 로드
    ///
    /// 이전에 로드한 엔진은 모두 버립니다 (프로바이더 전환 후 재로드).
    /// 캐시가 없거나 로드에 실패한 문서는 경고 후 건너뜁니다.
    pub fn load(
        &mut self,
        provider: Arc<dyn EmbeddingProvider>,
        descriptors: &[DocumentDescriptor],
    ) -> LoadReport {
        self.engines.clear();
        let mut report = LoadReport::default();

        for descriptor in descriptors {
            let name = descriptor.display_name();

            if !descriptor.is_cached() {
                tracing::warn!("Knowledge base not found for {}, skipping", name);
                report.skipped.push(SkippedDocument {
                    name,
                    reason: format!("cache file not found: {}", descriptor.cache_path.display()),
                });
                continue;
            }

            match DocumentSearchEngine::open(descriptor, Arc::clone(&provider), &self.options) {
                Ok(engine) => {
                    tracing::info!("Loaded {} ({} chunks)", name, engine.chunk_count());
                    self.engines.push(engine);
                    report.loaded += 1;
                }
                Err(e) => {
                    tracing::warn!("Failed to load knowledge base for {}: {}", name, e);
                    report.skipped.push(SkippedDocument {
                        name,
                        reason: e.to_string(),
                    });
                }
            }
        }

        report
    }

    /// 이미 만든 엔진 추가
    pub fn push(&mut self, engine: DocumentSearchEngine) {
        self.engines.push(engine);
    }

    /// 모든 문서 검색 후 점수순 상위 `top_k`
    ///
    /// 문서별 검색은 동시에 실행하고, 결과는 로드 순서로 모은 뒤
    /// 안정 정렬합니다. 한 문서라도 실패하면 전체가 실패합니다.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        if self.engines.is_empty() {
            return Ok(Vec::new());
        }

        let per_document = self.options.top_k;
        let searches = self
            .engines
            .iter()
            .map(|engine| engine.search(query, per_document));

        let mut results: Vec<SearchResult> = try_join_all(searches)
            .await?
            .into_iter()
            .flatten()
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        results.truncate(top_k);

        tracing::debug!(
            "Aggregated {} results from {} documents",
            results.len(),
            self.engines.len()
        );
        Ok(results)
    }

    /// 기본 `top_k`로 검색
    pub async fn search_default(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.search(query, self.options.aggregate_top_k).await
    }

    /// 문서 이름(대소문자 무시)과 페이지 번호로 페이지 내용 읽기
    pub fn read_page(&self, document_name: &str, page: u32) -> Option<String> {
        self.engine(document_name)?.read_page(page)
    }

    pub fn engine(&self, document_name: &str) -> Option<&DocumentSearchEngine> {
        let wanted = document_name.to_lowercase();
        self.engines
            .iter()
            .find(|e| e.name().to_lowercase() == wanted)
    }

    pub fn engines(&self) -> &[DocumentSearchEngine] {
        &self.engines
    }

    pub fn document_names(&self) -> Vec<&str> {
        self.engines.iter().map(|e| e.name()).collect()
    }

    pub fn loaded_document_count(&self) -> usize {
        self.engines.len()
    }
}

impl Default for MultiDocumentSearchEngine {
    fn default() -> Self {
        Self::new(SearchConfig::default())
    }
}

// ============================================================================
// Tests
// ============================================================================
