//! docvec - 문서별 벡터 지식베이스
//!
//! 로컬 문서(PDF, TXT, MD, JSON)를 문단 단위로 임베딩해 문서마다 JSON
//! 캐시로 저장하고, 여러 문서에 걸쳐 코사인 유사도 검색을 수행합니다.

pub mod cli;
pub mod collector;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod knowledge;
pub mod search;

// Re-exports
pub use config::AppConfig;
pub use embedding::{
    get_api_key, has_api_key, Embedder, EmbeddingProvider, OllamaEmbedding, OpenAiEmbedding,
    ProviderKind,
};
pub use error::{RagError, Result};
pub use ingest::{BatchFailurePolicy, IngestReport, Ingested, IngestionPipeline, PreparedDocuments};
pub use knowledge::{
    cosine_similarity, Chunk, DocumentDescriptor, KnowledgeBase, KnowledgeBaseMetadata,
    KnowledgeBaseStore, SearchResult,
};
pub use search::{DocumentSearchEngine, LoadReport, MultiDocumentSearchEngine, SkippedDocument};
