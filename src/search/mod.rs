//! Search 모듈
//!
//! - Document: 문서 하나의 코사인 유사도 검색
//! - Multi: 여러 문서 동시 검색 + 점수순 병합

mod document;
mod multi;

pub use document::DocumentSearchEngine;
pub use multi::{LoadReport, MultiDocumentSearchEngine, SkippedDocument};
