use async_trait::async_trait;
use config::EmbeddingConfig;
use errors::ProviderError;
use lru::LruCache;
use rag_core::EmbeddingService;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

const PROVIDER: &str = "embedding";

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String]
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>
}

/// Embedding client for OpenAI-compatible `/embeddings` endpoints.
///
/// Works against OpenAI as well as self-hosted servers such as
/// text-embeddings-inference. Single-text calls go through an LRU cache.
pub struct HttpEmbeddingService {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    dimension: usize,
    api_key: Option<String>,
    timeout_ms: u64,
    cache: Arc<RwLock<LruCache<String, Vec<f32>>>>
}

impl HttpEmbeddingService {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ProviderError::request(PROVIDER, e))?;

        let capacity = NonZeroUsize::new(config.cache_size).unwrap_or(NonZeroUsize::MIN);

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            dimension: config.dimension,
            api_key: config.api_key.clone(),
            timeout_ms: config.timeout_ms,
            cache: Arc::new(RwLock::new(LruCache::new(capacity)))
        })
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let mut request = self.client.post(&self.endpoint).json(&EmbeddingRequest {
            model: &self.model,
            input: texts
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout {
                    provider: PROVIDER.to_string(),
                    timeout_ms: self.timeout_ms
                }
            } else {
                ProviderError::request(PROVIDER, e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                provider: PROVIDER.to_string(),
                status: status.as_u16(),
                body
            });
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::malformed(PROVIDER, e))?;

        self.order_and_check(parsed.data, texts.len())
    }

    fn order_and_check(
        &self,
        mut data: Vec<EmbeddingData>,
        expected: usize
    ) -> Result<Vec<Vec<f32>>, ProviderError> {
        if data.len() != expected {
            return Err(ProviderError::malformed(
                PROVIDER,
                format!("expected {expected} embeddings, got {}", data.len())
            ));
        }

        if data.iter().all(|d| d.index.is_some()) {
            data.sort_by_key(|d| d.index);
        }

        data.into_iter()
            .map(|d| {
                if d.embedding.len() == self.dimension {
                    Ok(d.embedding)
                } else {
                    Err(ProviderError::DimensionMismatch {
                        provider: PROVIDER.to_string(),
                        expected: self.dimension,
                        actual: d.embedding.len()
                    })
                }
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingService for HttpEmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        {
            let mut cache = self.cache.write().await;
            if let Some(cached) = cache.get(text) {
                return Ok(cached.clone());
            }
        }

        let mut vectors = self.request(&[text.to_string()]).await?;
        let vector = vectors
            .pop()
            .ok_or_else(|| ProviderError::malformed(PROVIDER, "empty embedding list"))?;

        self.cache.write().await.put(text.to_string(), vector.clone());
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, texts), fields(batch = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self.request(texts).await?;
        debug!("Embedded {} texts with {}", vectors.len(), self.model);
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, dimension: usize) -> EmbeddingConfig {
        EmbeddingConfig {
            base_url: format!("{}/v1", server.uri()),
            dimension,
            api_key: Some("sk-test".to_string()),
            ..EmbeddingConfig::default()
        }
    }

    #[tokio::test]
    async fn test_batch_restores_index_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"embedding": [0.0, 1.0], "index": 1},
                    {"embedding": [1.0, 0.0], "index": 0}
                ]
            })))
            .mount(&server)
            .await;

        let service = HttpEmbeddingService::new(&config_for(&server, 2)).unwrap();
        let vectors = service
            .embed_batch(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn test_single_embed_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": [{"embedding": [0.5, 0.5], "index": 0}]}))
            )
            .expect(1)
            .mount(&server)
            .await;

        let service = HttpEmbeddingService::new(&config_for(&server, 2)).unwrap();
        assert_eq!(service.embed("fever").await.unwrap(), vec![0.5, 0.5]);
        assert_eq!(service.embed("fever").await.unwrap(), vec![0.5, 0.5]);
    }

    #[tokio::test]
    async fn test_status_and_dimension_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let service = HttpEmbeddingService::new(&config_for(&server, 2)).unwrap();
        let err = service.embed("x").await.unwrap_err();
        assert!(matches!(err, ProviderError::Status { status: 503, .. }));
        assert!(err.is_retryable());

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": [{"embedding": [1.0, 0.0, 0.0], "index": 0}]}))
            )
            .mount(&server)
            .await;
        let service = HttpEmbeddingService::new(&config_for(&server, 2)).unwrap();
        let err = service.embed("x").await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::DimensionMismatch {
                expected: 2,
                actual: 3,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let service = HttpEmbeddingService::new(&config_for(&server, 2)).unwrap();
        let err = service.embed("x").await.unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse { .. }));
    }
}
