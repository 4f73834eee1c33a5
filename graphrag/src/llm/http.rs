use async_trait::async_trait;
use config::{LlmAuth, LlmProviderConfig};
use errors::ProviderError;
use rag_core::LlmService;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};

use super::response::CompletionResponse;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatRequestMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32
}

#[derive(Serialize)]
struct ChatRequestMessage<'a> {
    role: &'static str,
    content: &'a str
}

/// Chat completion client for OpenAI-compatible providers.
pub struct OpenAiCompatibleLlm {
    client: reqwest::Client,
    name: String,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    auth: LlmAuth,
    temperature: f32,
    max_tokens: u32,
    timeout_ms: u64
}

impl OpenAiCompatibleLlm {
    pub fn new(config: &LlmProviderConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ProviderError::request(&config.name, e))?;

        Ok(Self {
            client,
            name: config.name.clone(),
            endpoint: chat_completions_url(&config.base_url),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            auth: config.auth,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_ms: config.timeout_ms
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// `{base}/v1/chat/completions`, or `{base}/chat/completions` when the base
/// already ends in `/v1`.
pub fn chat_completions_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.ends_with("/v1") {
        format!("{base}/chat/completions")
    } else {
        format!("{base}/v1/chat/completions")
    }
}

#[async_trait]
impl LlmService for OpenAiCompatibleLlm {
    #[instrument(skip(self, prompt), fields(provider = %self.name, prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatRequestMessage {
                role: "user",
                content: prompt
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = match self.auth {
                LlmAuth::Bearer => request.bearer_auth(key),
                LlmAuth::XAuthToken => request.header("X-Auth-Token", key),
                LlmAuth::None => request
            };
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout {
                    provider: self.name.clone(),
                    timeout_ms: self.timeout_ms
                }
            } else {
                ProviderError::request(&self.name, e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                provider: self.name.clone(),
                status: status.as_u16(),
                body
            });
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::malformed(&self.name, e))?;

        let text = parsed
            .extract_text()
            .ok_or_else(|| ProviderError::malformed(&self.name, "response contains no text"))?;

        debug!("{} generated {} chars", self.name, text.len());
        Ok(text.to_string())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
