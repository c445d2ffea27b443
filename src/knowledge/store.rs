//! Knowledge Base Store - JSON 파일 기반 지식베이스 저장소
//!
//! 문서 하나당 JSON 파일 하나입니다. 정규 스키마(metadata + chunks)와
//! 레거시 스키마(청크 배열만)를 읽을 수 있으며, 레거시 파일은 처음 로드할 때
//! 정규 스키마로 다시 씁니다.

use std::fmt;
use std::path::Path;

use chrono::Utc;

use super::model::{Chunk, KnowledgeBase, KnowledgeBaseMetadata};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

// ============================================================================
// Types
// ============================================================================

/// 기록된 프로바이더와 활성 프로바이더가 다름 (경고, 로드는 진행)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderMismatch {
    /// 지식베이스에 기록된 `provider/model`
    pub recorded: String,
    /// 현재 활성 `provider/model`
    pub active: String,
}

impl fmt::Display for ProviderMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Knowledge base was created with '{}' but using '{}'. \
             Embeddings may not be compatible; consider rebuilding the knowledge base.",
            self.recorded, self.active
        )
    }
}

/// 로드 결과
#[derive(Debug, Clone)]
pub struct LoadedKnowledgeBase {
    pub knowledge_base: KnowledgeBase,
    /// 이번 로드에서 레거시 → 정규 스키마 변환이 일어났는지
    pub migrated: bool,
    pub provider_mismatch: Option<ProviderMismatch>,
}

// ============================================================================
// KnowledgeBaseStore
// ============================================================================

/// 지식베이스 파일 로드/저장
pub struct KnowledgeBaseStore;

impl KnowledgeBaseStore {
    /// 정규 스키마로 저장 (부모 디렉토리 자동 생성)
    pub fn save(path: &Path, knowledge_base: &KnowledgeBase) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(knowledge_base)?;
        std::fs::write(path, json)?;

        tracing::info!(
            "Knowledge base saved to {:?} ({} chunks, {})",
            path,
            knowledge_base.chunks.len(),
            knowledge_base.metadata.identity()
        );
        Ok(())
    }

    /// 지식베이스 로드
    ///
    /// 1. 정규 스키마 파싱
    /// 2. 실패 시 레거시 스키마 파싱 → 활성 프로바이더로 메타데이터 생성 후 재저장
    /// 3. 둘 다 실패하면 `InvalidFormat`
    pub fn load(path: &Path, provider: &dyn EmbeddingProvider) -> Result<LoadedKnowledgeBase> {
        let (knowledge_base, migrated) = match Self::read(path)? {
            StoredSchema::Canonical(kb) => (kb, false),
            StoredSchema::Legacy(chunks) => {
                tracing::warn!("Migrating legacy knowledge base format: {:?}", path);
                let kb = KnowledgeBase {
                    metadata: metadata_for(provider),
                    chunks,
                };
                Self::save(path, &kb)?;
                (kb, true)
            }
        };

        let provider_mismatch = if knowledge_base.metadata.provider_id != provider.provider_id() {
            let mismatch = ProviderMismatch {
                recorded: knowledge_base.metadata.identity(),
                active: provider.identity(),
            };
            tracing::warn!("{}", mismatch);
            Some(mismatch)
        } else {
            None
        };

        tracing::info!(
            "Loaded {} chunks ({}) from {:?}",
            knowledge_base.chunks.len(),
            knowledge_base.metadata.identity(),
            path
        );

        Ok(LoadedKnowledgeBase {
            knowledge_base,
            migrated,
            provider_mismatch,
        })
    }
}

impl KnowledgeBaseStore {
    /// 청크만 읽기 (임베딩 프로바이더 불필요, 파일을 바꾸지 않음)
    pub fn read_chunks(path: &Path) -> Result<Vec<Chunk>> {
        match Self::read(path)? {
            StoredSchema::Canonical(kb) => Ok(kb.chunks),
            StoredSchema::Legacy(chunks) => Ok(chunks),
        }
    }

    /// 정규 스키마, 실패 시 레거시 스키마로 파싱
    fn read(path: &Path) -> Result<StoredSchema> {
        if !path.is_file() {
            return Err(RagError::NotFound(path.to_path_buf()));
        }

        let json = std::fs::read_to_string(path)?;

        match serde_json::from_str::<KnowledgeBase>(&json) {
            Ok(kb) => Ok(StoredSchema::Canonical(kb)),
            Err(canonical_err) => match serde_json::from_str::<Vec<Chunk>>(&json) {
                Ok(chunks) => Ok(StoredSchema::Legacy(chunks)),
                Err(legacy_err) => Err(RagError::InvalidFormat {
                    path: path.to_path_buf(),
                    canonical: canonical_err.to_string(),
                    legacy: legacy_err.to_string(),
                }),
            },
        }
    }
}

enum StoredSchema {
    Canonical(KnowledgeBase),
    Legacy(Vec<Chunk>),
}

/// 프로바이더 정보 + 현재 시각으로 메타데이터 생성
pub fn metadata_for(provider: &dyn EmbeddingProvider) -> KnowledgeBaseMetadata {
    KnowledgeBaseMetadata {
        provider_id: provider.provider_id().to_string(),
        model_id: provider.model_id().to_string(),
        dimensions: provider.dimensions(),
        created_at: Utc::now(),
    }
}

// ============================================================================
// Tests
// ============================================================================
