//! Chat completion response shapes accepted from OpenAI-compatible providers.

use serde::Deserialize;

/// Provider response body.
///
/// Providers differ in where the generated text lives; every accepted shape
/// is one variant, and [`CompletionResponse::extract_text`] is the only
/// place that knows how to read them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CompletionResponse {
    /// `choices[0].message.content`
    Chat { choices: Vec<ChatChoice> },
    /// `choices[0].text` (legacy completions)
    Text { choices: Vec<TextChoice> },
    /// `choices[0].delta.content` (single streamed chunk)
    Delta { choices: Vec<DeltaChoice> },
    /// `{"content": "..."}`
    Bare { content: String }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub content: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextChoice {
    pub text: String
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeltaChoice {
    pub delta: ChatMessage
}

impl CompletionResponse {
    /// Generated text, trimmed. `None` when the response carries no text.
    pub fn extract_text(&self) -> Option<&str> {
        let text = match self {
            Self::Chat { choices } => choices.first().and_then(|c| c.message.content.as_deref()),
            Self::Text { choices } => choices.first().map(|c| c.text.as_str()),
            Self::Delta { choices } => choices.first().and_then(|c| c.delta.content.as_deref()),
            Self::Bare { content } => Some(content.as_str())
        }?;

        let trimmed = text.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> CompletionResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_every_shape_extracts() {
        let chat = parse(json!({"choices": [{"message": {"role": "assistant", "content": " A "}}]}));
        assert!(matches!(chat, CompletionResponse::Chat { .. }));
        assert_eq!(chat.extract_text(), Some("A"));

        let text = parse(json!({"choices": [{"text": "B", "index": 0}]}));
        assert!(matches!(text, CompletionResponse::Text { .. }));
        assert_eq!(text.extract_text(), Some("B"));

        let delta = parse(json!({"choices": [{"delta": {"content": "C"}}]}));
        assert!(matches!(delta, CompletionResponse::Delta { .. }));
        assert_eq!(delta.extract_text(), Some("C"));

        let bare = parse(json!({"content": "D"}));
        assert_eq!(bare.extract_text(), Some("D"));
    }

    #[test]
    fn test_empty_text_is_none() {
        assert_eq!(parse(json!({"choices": []})).extract_text(), None);
        assert_eq!(
            parse(json!({"choices": [{"message": {"content": null}}]})).extract_text(),
            None
        );
        assert_eq!(parse(json!({"content": "   "})).extract_text(), None);
    }

    #[test]
    fn test_unknown_shape_rejected() {
        let result = serde_json::from_value::<CompletionResponse>(json!({"output": "x"}));
        assert!(result.is_err());
    }
}
