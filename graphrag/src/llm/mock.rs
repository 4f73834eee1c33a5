use async_trait::async_trait;
use errors::ProviderError;
use rag_core::LlmService;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// Scripted LLM for tests.
///
/// Responses are matched by prompt substring in insertion order; unmatched
/// prompts get the default response.
pub struct MockLlmService {
    name: String,
    responses: Arc<RwLock<Vec<(String, String)>>>,
    default_response: Option<String>,
    failing: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
    prompts: Arc<RwLock<Vec<String>>>
}

impl Default for MockLlmService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLlmService {
    pub fn new() -> Self {
        Self::named("mock")
    }

    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            responses: Arc::new(RwLock::new(Vec::new())),
            default_response: None,
            failing: false,
            delay: None,
            calls: AtomicUsize::new(0),
            prompts: Arc::new(RwLock::new(Vec::new()))
        }
    }

    pub fn with_default(mut self, response: &str) -> Self {
        self.default_response = Some(response.to_string());
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn add_response(&self, prompt_contains: &str, response: &str) {
        self.responses
            .write()
            .await
            .push((prompt_contains.to_string(), response.to_string()));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received so far, oldest first.
    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.read().await.clone()
    }
}

#[async_trait]
impl LlmService for MockLlmService {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.write().await.push(prompt.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing {
            return Err(ProviderError::request(&self.name, "injected failure"));
        }

        let responses = self.responses.read().await;
        if let Some((_, response)) = responses.iter().find(|(key, _)| prompt.contains(key.as_str()))
        {
            return Ok(response.clone());
        }

        Ok(self
            .default_response
            .clone()
            .unwrap_or_else(|| format!("Mock response for: {prompt}")))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_substring_matching_and_default() {
        let llm = MockLlmService::new().with_default("default");
        llm.add_response("fever", "fever answer").await;

        assert_eq!(llm.generate("I have a fever").await.unwrap(), "fever answer");
        assert_eq!(llm.generate("other").await.unwrap(), "default");
        assert_eq!(llm.calls(), 2);
        assert_eq!(llm.prompts().await.len(), 2);
    }

    #[tokio::test]
    async fn test_failing_mock() {
        let llm = MockLlmService::named("broken").failing();
        assert!(llm.generate("x").await.is_err());
    }
}
