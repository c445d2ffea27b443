//! 콘텐츠 추출 모듈
//!
//! 문서를 "페이지" 단위 텍스트 블록으로 변환합니다.
//! - PDF: 물리 페이지 하나당 블록 하나
//! - 텍스트(txt, md, json): 고정 크기 윈도우, 윈도우 번호가 가상 페이지 번호

pub mod pdf;

use std::path::Path;

use crate::collector::FileType;
use crate::error::{RagError, Result};

/// 텍스트 윈도우 기본 크기 (문자 수)
pub const DEFAULT_WINDOW_SIZE: usize = 2000;

/// 추출된 페이지 블록
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPage {
    /// 페이지 번호 (1부터 시작)
    pub page_number: u32,
    pub text: String,
}

/// 콘텐츠 추출기
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    window_size: usize,
}

impl Default for ContentExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE)
    }
}

impl ContentExtractor {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size: window_size.max(1),
        }
    }

    /// 파일에서 페이지 블록 추출 (확장자로 분기)
    pub async fn extract(&self, path: &Path) -> Result<Vec<ExtractedPage>> {
        let file_type = FileType::from_path(path).ok_or_else(|| RagError::UnsupportedFormat {
            extension: path
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
                .unwrap_or_default(),
        })?;

        let pages = match file_type {
            FileType::Text => self.extract_text(path).await?,
            FileType::Pdf => self.extract_pdf(path).await?,
        };

        tracing::info!(
            "Loaded {} sections from {} file: {:?}",
            pages.len(),
            file_type.label(),
            path
        );

        Ok(pages)
    }

    async fn extract_text(&self, path: &Path) -> Result<Vec<ExtractedPage>> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(split_windows(&content, self.window_size))
    }

    async fn extract_pdf(&self, path: &Path) -> Result<Vec<ExtractedPage>> {
        // PDF 추출은 CPU 바운드이므로 spawn_blocking 사용
        let owned = path.to_path_buf();
        let pages = tokio::task::spawn_blocking(move || pdf::extract_text_from_pdf(&owned))
            .await
            .map_err(|e| RagError::Extraction {
                path: path.to_path_buf(),
                message: format!("PDF extraction task failed: {}", e),
            })?
            .map_err(|e| RagError::Extraction {
                path: path.to_path_buf(),
                message: format!("{:#}", e),
            })?;

        Ok(pages
            .into_iter()
            .map(|(page_number, text)| ExtractedPage { page_number, text })
            .collect())
    }
}

/// 텍스트를 고정 크기 윈도우로 분할
///
/// 윈도우 크기는 문자 단위입니다. 페이지 번호 = `offset / window_size + 1`.
pub fn split_windows(content: &str, window_size: usize) -> Vec<ExtractedPage> {
    let window_size = window_size.max(1);
    let chars: Vec<char> = content.chars().collect();

    chars
        .chunks(window_size)
        .enumerate()
        .map(|(i, window)| ExtractedPage {
            page_number: i as u32 + 1,
            text: window.iter().collect(),
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
