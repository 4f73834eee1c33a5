use async_trait::async_trait;
use config::LlmConfig;
use errors::ProviderError;
use rag_core::LlmService;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::http::OpenAiCompatibleLlm;
use crate::telemetry::GraphRagTelemetry;

struct ProviderSlot {
    service: Arc<dyn LlmService>,
    timeout: Duration
}

/// Ordered provider chain. The first provider that answers wins.
pub struct FallbackLlm {
    providers: Vec<ProviderSlot>,
    telemetry: GraphRagTelemetry
}

impl Default for FallbackLlm {
    fn default() -> Self {
        Self::new()
    }
}

impl FallbackLlm {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            telemetry: GraphRagTelemetry::new()
        }
    }

    /// Builds one HTTP client per configured provider, in order.
    pub fn from_config(config: &LlmConfig) -> Result<Self, ProviderError> {
        let mut chain = Self::new();
        for provider in &config.providers {
            let service = OpenAiCompatibleLlm::new(provider)?;
            chain = chain.with_provider(
                Arc::new(service),
                Duration::from_millis(provider.timeout_ms)
            );
        }
        Ok(chain)
    }

    pub fn with_provider(mut self, service: Arc<dyn LlmService>, timeout: Duration) -> Self {
        self.providers.push(ProviderSlot { service, timeout });
        self
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[async_trait]
impl LlmService for FallbackLlm {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        if self.providers.is_empty() {
            return Err(ProviderError::NotConfigured {
                capability: "llm".to_string()
            });
        }

        let mut last_error = String::new();
        for (position, slot) in self.providers.iter().enumerate() {
            let name = slot.service.name();
            let outcome = match tokio::time::timeout(slot.timeout, slot.service.generate(prompt)).await
            {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout {
                    provider: name.to_string(),
                    timeout_ms: u64::try_from(slot.timeout.as_millis()).unwrap_or(u64::MAX)
                })
            };

            match outcome {
                Ok(text) => {
                    if position > 0 {
                        info!("LLM provider {} answered after {} failures", name, position);
                    }
                    return Ok(text);
                }
                Err(e) => {
                    warn!("LLM provider {} failed: {}", name, e);
                    self.telemetry.record_provider_failure(name);
                    last_error = e.to_string();
                }
            }
        }

        Err(ProviderError::AllProvidersFailed {
            attempted: self.providers.len(),
            last: last_error
        })
    }

    fn name(&self) -> &str {
        "fallback"
    }
}
