//! 벡터 유틸리티

/// 코사인 유사도 계산
///
/// `dot(a, b) / (‖a‖·‖b‖)`, 결과는 -1.0 ~ 1.0 범위로 고정됩니다.
/// 길이가 다르거나 비어 있거나 영벡터이면 0.0을 반환합니다.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot_product / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

// ============================================================================
// Tests
// ============================================================================
