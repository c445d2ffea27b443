//! Text Chunking Module
//!
//! 페이지 블록을 문단 단위 청크로 나누고 잡음(짧은 줄, 페이지 번호,
//! 러닝 헤더)을 걸러냅니다.

// ============================================================================
// Chunk Configuration
// ============================================================================

/// 청킹 설정
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// 최소 청크 크기 (문자 수, 미만이면 버림)
    pub min_characters: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self { min_characters: 30 }
    }
}

// ============================================================================
// Chunker Trait
// ============================================================================

/// 텍스트 청킹 전략 트레이트
pub trait Chunker: Send + Sync {
    /// 텍스트를 청크로 분할
    fn chunk(&self, text: &str) -> Vec<String>;
}

// ============================================================================
// ParagraphChunker
// ============================================================================

/// 문단 청커
///
/// - 빈 줄(문단 경계)로 분할
/// - 문단 내부 줄바꿈은 공백으로
/// - 최소 길이 미만이거나 정수뿐인 문단은 제거
pub struct ParagraphChunker {
    config: ChunkConfig,
}

impl ParagraphChunker {
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(ChunkConfig::default())
    }

    /// 잡음 여부 판단
    fn is_noise(&self, paragraph: &str) -> bool {
        paragraph.chars().count() < self.config.min_characters || is_integer(paragraph)
    }
}

impl Chunker for ParagraphChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        let normalized = text.replace("\r\n", "\n");

        normalized
            .split("\n\n")
            .map(|para| para.replace('\n', " ").trim().to_string())
            .filter(|para| !para.is_empty() && !self.is_noise(para))
            .collect()
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 문자열 전체가 정수인지 (선택적 부호 + 숫자)
fn is_integer(s: &str) -> bool {
    let digits = s.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(s);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

// ============================================================================
// Tests
// ============================================================================
