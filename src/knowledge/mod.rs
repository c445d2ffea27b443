//! Knowledge 모듈 - 문서별 벡터 지식베이스
//!
//! - Model: 청크, 메타데이터, 검색 결과
//! - Cache: (문서 경로, 프로바이더) → 캐시 파일 경로
//! - Store: JSON 로드/저장 + 레거시 스키마 마이그레이션
//! - Chunker: 문단 분할 + 잡음 필터
//! - Vector: 코사인 유사도

pub mod cache;
mod chunker;
mod model;
mod store;
mod vector;

// Re-exports
pub use chunker::{ChunkConfig, Chunker, ParagraphChunker};
pub use model::{
    page_text, Chunk, DocumentDescriptor, KnowledgeBase, KnowledgeBaseMetadata, SearchResult,
};
pub use store::{metadata_for, KnowledgeBaseStore, LoadedKnowledgeBase, ProviderMismatch};
pub use vector::cosine_similarity;
