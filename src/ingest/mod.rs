//! 수집 파이프라인
//!
//! 문서 → 페이지 블록 → 문단 청크 → 배치 임베딩 → 지식베이스 JSON.
//! 배치는 한 번에 하나씩 순차 처리하며, 실패한 배치의 처리 방식은
//! [`BatchFailurePolicy`]로 지정합니다.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::IngestConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::extractor::{ContentExtractor, ExtractedPage};
use crate::knowledge::{
    metadata_for, ChunkConfig, Chunk, Chunker, DocumentDescriptor, KnowledgeBase,
    KnowledgeBaseStore, ParagraphChunker,
};

// ============================================================================
// Types
// ============================================================================

/// 배치 임베딩 실패 처리 정책
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum BatchFailurePolicy {
    /// 지수 백오프로 재시도, 모두 실패하면 해당 배치 청크 제외
    Retry { attempts: u32 },
    /// 바로 제외
    Exclude,
    /// 수집 전체를 실패 처리
    Abort,
}

impl Default for BatchFailurePolicy {
    fn default() -> Self {
        BatchFailurePolicy::Retry { attempts: 3 }
    }
}

impl BatchFailurePolicy {
    fn max_attempts(&self) -> u32 {
        match self {
            BatchFailurePolicy::Retry { attempts } => (*attempts).max(1),
            BatchFailurePolicy::Exclude | BatchFailurePolicy::Abort => 1,
        }
    }
}

/// 임베딩 전 청크 후보
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChunk {
    pub id: u32,
    pub page_number: u32,
    pub content: String,
}

/// 수집 통계
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub pages: usize,
    pub chunks_discovered: usize,
    pub chunks_embedded: usize,
    pub chunks_excluded: usize,
    /// 실패한 배치 번호 (0부터)
    pub failed_batches: Vec<usize>,
}

/// 수집 결과
#[derive(Debug, Clone)]
pub struct Ingested {
    pub knowledge_base: KnowledgeBase,
    pub report: IngestReport,
}

/// 여러 문서의 캐시 준비 결과
#[derive(Debug, Default)]
pub struct PreparedDocuments {
    /// 사용 가능한 캐시가 있는 문서
    pub descriptors: Vec<DocumentDescriptor>,
    pub built: usize,
    pub cached: usize,
    /// (문서 경로, 실패 사유)
    pub failed: Vec<(PathBuf, String)>,
}

// ============================================================================
// IngestionPipeline
// ============================================================================

pub struct IngestionPipeline {
    extractor: ContentExtractor,
    chunker: Box<dyn Chunker>,
    batch_size: usize,
    policy: BatchFailurePolicy,
    retry_delay: Duration,
}

impl Default for IngestionPipeline {
    fn default() -> Self {
        Self::new(&IngestConfig::default())
    }
}

impl IngestionPipeline {
    pub fn new(config: &IngestConfig) -> Self {
        Self {
            extractor: ContentExtractor::new(config.window_size),
            chunker: Box::new(ParagraphChunker::new(ChunkConfig {
                min_characters: config.min_chunk_chars,
            })),
            batch_size: config.batch_size.max(1),
            policy: config.batch_policy,
            retry_delay: Duration::from_millis(500),
        }
    }

    /// 재시도 초기 대기 시간 지정
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_policy(mut self, policy: BatchFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 문서 하나로 지식베이스를 만들고 `output_path`에 저장
    pub async fn build(
        &self,
        file_path: &Path,
        provider: &dyn EmbeddingProvider,
        output_path: &Path,
    ) -> Result<Ingested> {
        tracing::info!("Starting ingestion: {:?}", file_path);

        let pages = self.extractor.extract(file_path).await?;
        let pending = self.chunk_pages(&pages);

        tracing::info!("Extracted {} valid paragraphs", pending.len());

        let mut report = IngestReport {
            pages: pages.len(),
            chunks_discovered: pending.len(),
            ..Default::default()
        };

        let chunks = self.embed_chunks(&pending, provider, &mut report).await?;

        let knowledge_base = KnowledgeBase {
            metadata: metadata_for(provider),
            chunks,
        };
        KnowledgeBaseStore::save(output_path, &knowledge_base)?;

        Ok(Ingested {
            knowledge_base,
            report,
        })
    }

    /// 페이지 블록을 청크 후보로 변환 (문서 전체에 걸친 순차 ID)
    pub fn chunk_pages(&self, pages: &[ExtractedPage]) -> Vec<PendingChunk> {
        let mut next_id = 0u32;
        let mut pending = Vec::new();

        for page in pages {
            for content in self.chunker.chunk(&page.text) {
                pending.push(PendingChunk {
                    id: next_id,
                    page_number: page.page_number,
                    content,
                });
                next_id += 1;
            }
        }

        pending
    }

    async fn embed_chunks(
        &self,
        pending: &[PendingChunk],
        provider: &dyn EmbeddingProvider,
        report: &mut IngestReport,
    ) -> Result<Vec<Chunk>> {
        let mut chunks = Vec::with_capacity(pending.len());
        let total_batches = pending.len().div_ceil(self.batch_size);

        for (batch_index, batch) in pending.chunks(self.batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();

            tracing::debug!("Embedding batch {}/{}", batch_index + 1, total_batches);

            match self.embed_with_policy(batch_index, &texts, provider).await? {
                Some(vectors) => {
                    chunks.extend(batch.iter().zip(vectors).map(|(c, vector)| Chunk {
                        id: c.id,
                        page_number: c.page_number,
                        content: c.content.clone(),
                        vector,
                    }));
                    report.chunks_embedded += batch.len();
                }
                None => {
                    report.chunks_excluded += batch.len();
                    report.failed_batches.push(batch_index);
                }
            }
        }

        Ok(chunks)
    }

    /// 정책에 따라 배치 임베딩. 제외되면 `Ok(None)`
    async fn embed_with_policy(
        &self,
        batch_index: usize,
        texts: &[String],
        provider: &dyn EmbeddingProvider,
    ) -> Result<Option<Vec<Vec<f32>>>> {
        let max_attempts = self.policy.max_attempts();
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                let backoff = self.retry_delay * 2u32.pow((attempt - 2).min(5));
                tracing::warn!(
                    "Retrying embedding batch {} in {:?} (attempt {}/{})",
                    batch_index,
                    backoff,
                    attempt,
                    max_attempts
                );
                tokio::time::sleep(backoff).await;
            }

            match embed_validated(texts, provider).await {
                Ok(vectors) => return Ok(Some(vectors)),
                Err(e) => last_error = format!("{:#}", e),
            }
        }

        if self.policy == BatchFailurePolicy::Abort {
            return Err(RagError::BatchEmbeddingFailure {
                batch: batch_index,
                attempts: max_attempts,
                message: last_error,
            });
        }

        tracing::warn!(
            "Error fetching embeddings for batch {} ({} chunks excluded): {}",
            batch_index,
            texts.len(),
            last_error
        );
        Ok(None)
    }

    /// 여러 문서의 지식베이스 준비
    ///
    /// 캐시가 없거나 `force`면 새로 만들고, 있으면 재사용합니다.
    /// 한 문서의 실패는 기록만 하고 나머지 문서는 계속 처리합니다.
    pub async fn ensure_knowledge_bases(
        &self,
        paths: &[PathBuf],
        provider: &dyn EmbeddingProvider,
        cache_dir: &Path,
        force: bool,
    ) -> PreparedDocuments {
        let mut prepared = PreparedDocuments::default();

        for path in paths {
            let descriptor = DocumentDescriptor::new(path, cache_dir, provider.provider_id());

            if descriptor.is_cached() && !force {
                tracing::info!("Using cached knowledge base for {:?}", path);
                prepared.cached += 1;
                prepared.descriptors.push(descriptor);
                continue;
            }

            match self.build(path, provider, &descriptor.cache_path).await {
                Ok(ingested) => {
                    tracing::info!(
                        "Built knowledge base for {:?}: {} chunks ({} excluded)",
                        path,
                        ingested.report.chunks_embedded,
                        ingested.report.chunks_excluded
                    );
                    prepared.built += 1;
                    prepared.descriptors.push(descriptor);
                }
                Err(e) => {
                    tracing::warn!("Failed to build knowledge base for {:?}: {}", path, e);
                    prepared.failed.push((path.clone(), e.to_string()));
                }
            }
        }

        prepared
    }
}

/// 배치 임베딩 + 결과 검증 (개수, 차원)
async fn embed_validated(
    texts: &[String],
    provider: &dyn EmbeddingProvider,
) -> anyhow::Result<Vec<Vec<f32>>> {
    let vectors = provider.embed_batch(texts).await?;

    if vectors.len() != texts.len() {
        anyhow::bail!(
            "provider returned {} vectors for {} texts",
            vectors.len(),
            texts.len()
        );
    }

    let expected = provider.dimensions();
    if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
        anyhow::bail!(
            "provider returned a {}D vector, expected {}D",
            bad.len(),
            expected
        );
    }

    Ok(vectors)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::testing::FakeEmbedding;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    fn pipeline(policy: BatchFailurePolicy) -> IngestionPipeline {
        IngestionPipeline::default()
            .with_policy(policy)
            .with_retry_delay(Duration::ZERO)
    }

    fn paragraph(n: usize) -> String {
        format!("Paragraph number {n} has enough characters to survive the filter.")
    }

    fn write_paragraphs(dir: &TempDir, name: &str, count: usize) -> PathBuf {
        let text = (0..count).map(paragraph).collect::<Vec<_>>().join("\n\n");
        let path = dir.path().join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    /// 2000자 윈도우 두 개: 1페이지(짧은 줄 + 40자 문단), 2페이지("42" + 유효 문단)
    #[tokio::test]
    async fn test_two_page_text_document() {
        let dir = TempDir::new().unwrap();

        let kept_first = "This paragraph is exactly forty chars!!!";
        assert_eq!(kept_first.chars().count(), 40);

        let mut page_one = format!("Short line\n\n{kept_first}\n\n");
        page_one.push_str(&"\n".repeat(2000 - page_one.chars().count()));
        assert_eq!(page_one.chars().count(), 2000);

        let kept_second = "The second page carries one valid paragraph.";
        let content = format!("{page_one}42\n\n{kept_second}");

        let path = dir.path().join("two_pages.txt");
        std::fs::write(&path, content).unwrap();
        let output = dir.path().join("two_pages_knowledge.json");

        let provider = FakeEmbedding::new("fake", "fake-model", 4);
        let ingested = pipeline(BatchFailurePolicy::Abort)
            .build(&path, &provider, &output)
            .await
            .unwrap();

        let chunks = &ingested.knowledge_base.chunks;
        assert_eq!(chunks.len(), 2);
        assert_eq!((chunks[0].id, chunks[0].page_number), (0, 1));
        assert_eq!((chunks[1].id, chunks[1].page_number), (1, 2));
        assert_eq!(chunks[0].content, kept_first);
        assert_eq!(chunks[1].content, kept_second);
        assert_eq!(ingested.report.pages, 2);
        assert!(output.is_file());
    }

    #[tokio::test]
    async fn test_metadata_and_persistence() {
        let dir = TempDir::new().unwrap();
        let path = write_paragraphs(&dir, "doc.md", 3);
        let output = dir.path().join("out").join("doc_knowledge.json");

        let provider = FakeEmbedding::new("ollama", "nomic-embed-text", 4);
        let ingested = pipeline(BatchFailurePolicy::default())
            .build(&path, &provider, &output)
            .await
            .unwrap();

        let meta = &ingested.knowledge_base.metadata;
        assert_eq!(meta.provider_id, "ollama");
        assert_eq!(meta.model_id, "nomic-embed-text");
        assert_eq!(meta.dimensions, 4);
        assert!(ingested.knowledge_base.is_consistent());

        let loaded = KnowledgeBaseStore::load(&output, &provider).unwrap();
        assert_eq!(loaded.knowledge_base, ingested.knowledge_base);
    }

    #[tokio::test]
    async fn test_batches_of_ten() {
        let dir = TempDir::new().unwrap();
        let path = write_paragraphs(&dir, "doc.txt", 25);
        let output = dir.path().join("doc_knowledge.json");

        let provider = FakeEmbedding::new("fake", "fake-model", 4);
        let ingested = pipeline(BatchFailurePolicy::Abort)
            .build(&path, &provider, &output)
            .await
            .unwrap();

        assert_eq!(provider.batch_calls.load(Ordering::SeqCst), 3);
        assert_eq!(ingested.knowledge_base.chunks.len(), 25);
        let ids: Vec<u32> = ingested.knowledge_base.chunks.iter().map(|c| c.id).collect();
        assert_eq!(ids, (0..25).collect::<Vec<u32>>());
    }

    #[tokio::test]
    async fn test_exclude_policy_drops_failed_batch() {
        let dir = TempDir::new().unwrap();
        // 12번 문단이 두 번째 배치(10..20)에 들어감
        let path = write_paragraphs(&dir, "doc.txt", 25);
        let output = dir.path().join("doc_knowledge.json");

        let provider = FakeEmbedding::new("fake", "fake-model", 4).failing_on("number 12 ");
        let ingested = pipeline(BatchFailurePolicy::Exclude)
            .build(&path, &provider, &output)
            .await
            .unwrap();

        let report = &ingested.report;
        assert_eq!(report.failed_batches, vec![1]);
        assert_eq!(report.chunks_excluded, 10);
        assert_eq!(report.chunks_embedded, 15);

        let ids: Vec<u32> = ingested.knowledge_base.chunks.iter().map(|c| c.id).collect();
        let expected: Vec<u32> = (0..10).chain(20..25).collect();
        assert_eq!(ids, expected);
        assert!(ingested.knowledge_base.is_consistent());
    }

    #[tokio::test]
    async fn test_retry_policy_recovers_transient_failure() {
        let dir = TempDir::new().unwrap();
        let path = write_paragraphs(&dir, "doc.txt", 5);
        let output = dir.path().join("doc_knowledge.json");

        let provider = FakeEmbedding::new("fake", "fake-model", 4).failing_first(2);
        let ingested = pipeline(BatchFailurePolicy::Retry { attempts: 3 })
            .build(&path, &provider, &output)
            .await
            .unwrap();

        assert_eq!(provider.batch_calls.load(Ordering::SeqCst), 3);
        assert_eq!(ingested.knowledge_base.chunks.len(), 5);
        assert!(ingested.report.failed_batches.is_empty());
    }

    #[tokio::test]
    async fn test_retry_policy_excludes_after_exhaustion() {
        let dir = TempDir::new().unwrap();
        let path = write_paragraphs(&dir, "doc.txt", 5);
        let output = dir.path().join("doc_knowledge.json");

        let provider = FakeEmbedding::new("fake", "fake-model", 4).failing_on("Paragraph");
        let ingested = pipeline(BatchFailurePolicy::Retry { attempts: 2 })
            .build(&path, &provider, &output)
            .await
            .unwrap();

        assert_eq!(provider.batch_calls.load(Ordering::SeqCst), 2);
        assert!(ingested.knowledge_base.chunks.is_empty());
        assert_eq!(ingested.report.failed_batches, vec![0]);
    }

    #[tokio::test]
    async fn test_abort_policy_fails_and_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = write_paragraphs(&dir, "doc.txt", 5);
        let output = dir.path().join("doc_knowledge.json");

        let provider = FakeEmbedding::new("fake", "fake-model", 4).failing_on("Paragraph");
        let err = pipeline(BatchFailurePolicy::Abort)
            .build(&path, &provider, &output)
            .await
            .unwrap_err();

        assert!(matches!(err, RagError::BatchEmbeddingFailure { batch: 0, attempts: 1, .. }));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_wrong_dimension_vectors_are_a_batch_failure() {
        let dir = TempDir::new().unwrap();
        let path = write_paragraphs(&dir, "doc.txt", 1);
        let output = dir.path().join("doc_knowledge.json");

        let provider =
            FakeEmbedding::new("fake", "fake-model", 4).with_vector(&paragraph(0), vec![1.0, 0.0]);
        let err = pipeline(BatchFailurePolicy::Abort)
            .build(&path, &provider, &output)
            .await
            .unwrap_err();

        match err {
            RagError::BatchEmbeddingFailure { message, .. } => assert!(message.contains("2D")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_unsupported_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("slides.pptx");
        std::fs::write(&path, "x").unwrap();

        let provider = FakeEmbedding::new("fake", "fake-model", 4);
        let err = pipeline(BatchFailurePolicy::default())
            .build(&path, &provider, &dir.path().join("out.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::UnsupportedFormat { .. }));
    }

    #[tokio::test]
    async fn test_ensure_knowledge_bases_builds_then_reuses() {
        let dir = TempDir::new().unwrap();
        let cache_dir = dir.path().join("cache");
        let good = write_paragraphs(&dir, "good.md", 2);
        let bad = dir.path().join("missing.txt");

        let provider = FakeEmbedding::new("fake", "fake-model", 4);
        let pipeline = pipeline(BatchFailurePolicy::default());

        let paths = vec![good.clone(), bad.clone()];
        let first = pipeline
            .ensure_knowledge_bases(&paths, &provider, &cache_dir, false)
            .await;
        assert_eq!(first.built, 1);
        assert_eq!(first.cached, 0);
        assert_eq!(first.failed.len(), 1);
        assert_eq!(first.failed[0].0, bad);
        assert_eq!(first.descriptors.len(), 1);
        assert!(first.descriptors[0].cache_path.starts_with(&cache_dir));

        let second = pipeline
            .ensure_knowledge_bases(&[good.clone()], &provider, &cache_dir, false)
            .await;
        assert_eq!((second.built, second.cached), (0, 1));

        let forced = pipeline
            .ensure_knowledge_bases(&[good], &provider, &cache_dir, true)
            .await;
        assert_eq!((forced.built, forced.cached), (1, 0));
    }
}
