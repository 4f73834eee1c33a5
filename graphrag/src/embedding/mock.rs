use async_trait::async_trait;
use errors::ProviderError;
use rag_core::EmbeddingService;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Keyword axes for the deterministic mock embedding.
const AXES: &[(&str, usize)] = &[
    ("fever", 0),
    ("cough", 1),
    ("headache", 2),
    ("diabetes", 3),
    ("insulin", 4),
    ("heart", 5),
    ("blood", 6),
    ("pain", 7),
    ("infection", 8),
    ("allergy", 9)
];

/// Deterministic embedding service for tests.
///
/// Texts are mapped onto keyword axes; exact texts can be pinned to a
/// vector with [`MockEmbeddingService::with_vector`], and any text
/// containing a marker registered with
/// [`MockEmbeddingService::fail_when_contains`] produces an error.
pub struct MockEmbeddingService {
    dimension: usize,
    overrides: HashMap<String, Vec<f32>>,
    failure_markers: Vec<String>,
    batch_calls: AtomicUsize
}

impl MockEmbeddingService {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            overrides: HashMap::new(),
            failure_markers: Vec::new(),
            batch_calls: AtomicUsize::new(0)
        }
    }

    pub fn with_vector(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.overrides.insert(text.into(), vector);
        self
    }

    pub fn fail_when_contains(mut self, marker: impl Into<String>) -> Self {
        self.failure_markers.push(marker.into());
        self
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    fn generate_mock_embedding(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0; self.dimension];
        if self.dimension == 0 {
            return embedding;
        }
        let text_lower = text.to_lowercase();

        for (keyword, axis) in AXES {
            if text_lower.contains(keyword) {
                embedding[axis % self.dimension] += 1.0;
            }
        }

        // Keeps unrelated texts from collapsing onto the zero vector.
        embedding[self.dimension - 1] += 0.1;
        embedding
    }
}

#[async_trait]
impl EmbeddingService for MockEmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        if let Some(vector) = self.overrides.get(text) {
            return Ok(vector.clone());
        }
        if self.failure_markers.iter().any(|m| text.contains(m.as_str())) {
            return Err(ProviderError::request("mock", "injected embedding failure"));
        }
        Ok(self.generate_mock_embedding(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "mock"
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_embedding_axes() {
        let service = MockEmbeddingService::new(16);

        let fever = service.embed("Fever and cough for two days").await.unwrap();
        assert_eq!(fever.len(), 16);
        assert!(fever[0] > 0.0);
        assert!(fever[1] > 0.0);
        assert_eq!(fever[3], 0.0);

        let diabetes = service.embed("Insulin dosing in diabetes").await.unwrap();
        assert!(diabetes[3] > 0.0);
        assert!(diabetes[4] > 0.0);
        assert_ne!(fever, diabetes);
    }

    #[tokio::test]
    async fn test_mock_embedding_is_deterministic() {
        let service = MockEmbeddingService::new(8);
        let a = service.embed("chest pain").await.unwrap();
        let b = service.embed("chest pain").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_overrides_and_failures() {
        let service = MockEmbeddingService::new(3)
            .with_vector("pinned", vec![1.0, 2.0, 3.0])
            .fail_when_contains("POISON");

        assert_eq!(service.embed("pinned").await.unwrap(), vec![1.0, 2.0, 3.0]);
        assert!(service.embed("a POISON text").await.is_err());

        let texts = vec!["ok".to_string(), "POISON".to_string()];
        assert!(service.embed_batch(&texts).await.is_err());
        assert_eq!(service.batch_calls(), 1);
    }
}
