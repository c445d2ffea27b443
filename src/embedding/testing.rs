//! 테스트용 결정적 임베딩 프로바이더

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use super::EmbeddingProvider;

/// 텍스트 → 벡터 표를 사용하는 가짜 프로바이더
///
/// 표에 없는 텍스트는 마지막 축의 단위 벡터로 임베딩됩니다.
pub(crate) struct FakeEmbedding {
    provider: String,
    model: String,
    dims: usize,
    table: HashMap<String, Vec<f32>>,
    /// 이 문자열을 포함한 배치는 항상 실패
    fail_marker: Option<String>,
    /// 처음 N번의 배치 호출은 실패
    transient_failures: AtomicUsize,
    /// `embed` 응답 지연
    delay: Duration,
    pub batch_calls: AtomicUsize,
}

impl FakeEmbedding {
    pub fn new(provider: &str, model: &str, dims: usize) -> Self {
        Self {
            provider: provider.to_string(),
            model: model.to_string(),
            dims,
            table: HashMap::new(),
            fail_marker: None,
            transient_failures: AtomicUsize::new(0),
            delay: Duration::ZERO,
            batch_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.table.insert(text.to_string(), vector);
        self
    }

    pub fn failing_on(mut self, marker: &str) -> Self {
        self.fail_marker = Some(marker.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_first(self, calls: usize) -> Self {
        self.transient_failures.store(calls, Ordering::SeqCst);
        self
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        self.table.get(text).cloned().unwrap_or_else(|| {
            let mut v = vec![0.0; self.dims];
            if let Some(last) = v.last_mut() {
                *last = 1.0;
            }
            v
        })
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.vector_for(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);

        let remaining = self.transient_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.transient_failures.store(remaining - 1, Ordering::SeqCst);
            anyhow::bail!("transient provider failure");
        }

        if let Some(marker) = &self.fail_marker {
            if texts.iter().any(|t| t.contains(marker.as_str())) {
                anyhow::bail!("provider rejected batch");
            }
        }

        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn provider_id(&self) -> &str {
        &self.provider
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
