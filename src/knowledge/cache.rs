//! 캐시 키 - (문서 경로, 프로바이더) → 캐시 파일 경로
//!
//! 파일명: `<basename>_<16자리 hex>_<provider>_knowledge.json`
//! hex는 소문자 전체 경로의 SHA-256 앞 8바이트입니다. 같은 이름의 다른 위치
//! 문서나 같은 문서의 다른 프로바이더 캐시는 서로 충돌하지 않습니다.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// 캐시 파일 접미사
pub const CACHE_SUFFIX: &str = "_knowledge.json";

/// 캐시 파일 경로 계산 (순수 함수, 파일시스템 접근 없음)
pub fn derive(cache_dir: &Path, document_path: &Path, provider_id: &str) -> PathBuf {
    let basename = document_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    cache_dir.join(format!(
        "{}_{}_{}{}",
        basename,
        path_digest(document_path),
        provider_id,
        CACHE_SUFFIX
    ))
}

/// 소문자 정규화한 경로의 SHA-256 앞 8바이트 (16 hex)
pub fn path_digest(document_path: &Path) -> String {
    let normalized = document_path.to_string_lossy().to_lowercase();
    let hash = Sha256::digest(normalized.as_bytes());

    hash.iter().take(8).map(|b| format!("{:02x}", b)).collect()
}
