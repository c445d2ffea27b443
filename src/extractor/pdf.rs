//! PDF 텍스트 추출 모듈
//!
//! pdf-extract 크레이트를 사용하여 PDF에서 페이지별 텍스트를 추출합니다.

use std::path::Path;

use anyhow::{Context, Result};

/// PDF에서 페이지별 텍스트 추출
///
/// (페이지 번호, 텍스트) 튜플 벡터를 반환합니다. 페이지 번호는 1부터 시작하며
/// 빈 페이지도 번호를 유지합니다 (물리 페이지 번호 보존).
pub fn extract_text_from_pdf(path: &Path) -> Result<Vec<(u32, String)>> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read PDF: {:?}", path))?;

    let pages = extract_pages_from_mem(&bytes)
        .with_context(|| format!("Failed to extract text from PDF: {:?}", path))?;

    if pages.iter().all(|(_, text)| text.trim().is_empty()) {
        tracing::warn!(
            "No text extracted from PDF: {:?}. It might be a scanned document.",
            path
        );
    }

    Ok(pages)
}

/// 메모리의 PDF 바이트에서 페이지별 텍스트 추출
fn extract_pages_from_mem(bytes: &[u8]) -> Result<Vec<(u32, String)>> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)?;

    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(i, text)| (i as u32 + 1, text))
        .collect())
}

// ============================================================================
// Tests
// ============================================================================
