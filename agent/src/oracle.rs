//! Stop/continue decisions for the iterative executor.

use async_trait::async_trait;
use config::AgentConfig;
use errors::OracleError;
use rag_core::LlmService;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::debug;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DecisionSource {
    Llm,
    Heuristic
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningDecision {
    pub sufficient: bool,
    pub should_stop: bool,
    pub missing_info: String,
    pub next_action: String,
    pub source: DecisionSource
}

/// Decides whether the accumulated context answers the query.
///
/// Implementations see only the query, the context length in characters and
/// the action of the step that just ran.
#[async_trait]
pub trait ReasoningOracle: Send + Sync {
    async fn decide(
        &self,
        query: &str,
        context_chars: usize,
        last_step: &str
    ) -> Result<ReasoningDecision, OracleError>;
}

/// Length-only oracle. Always answers, so it doubles as the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeuristicOracle {
    pub sufficient_chars: usize,
    pub stop_chars: usize
}

impl Default for HeuristicOracle {
    fn default() -> Self {
        Self {
            sufficient_chars: 500,
            stop_chars: 1000
        }
    }
}

impl HeuristicOracle {
    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            sufficient_chars: config.sufficient_chars,
            stop_chars: config.stop_chars
        }
    }

    pub fn evaluate(&self, context_chars: usize) -> ReasoningDecision {
        let below_stop = context_chars < self.stop_chars;
        ReasoningDecision {
            sufficient: context_chars > self.sufficient_chars,
            should_stop: context_chars > self.stop_chars,
            missing_info: if below_stop {
                "Additional context may be needed".to_string()
            } else {
                String::new()
            },
            next_action: if below_stop { "continue_retrieval" } else { "stop" }.to_string(),
            source: DecisionSource::Heuristic
        }
    }
}

#[async_trait]
impl ReasoningOracle for HeuristicOracle {
    async fn decide(
        &self,
        _query: &str,
        context_chars: usize,
        _last_step: &str
    ) -> Result<ReasoningDecision, OracleError> {
        Ok(self.evaluate(context_chars))
    }
}

#[derive(Debug, Deserialize)]
struct LlmDecision {
    sufficient: bool,
    should_stop: bool,
    #[serde(default)]
    missing_info: String,
    #[serde(default)]
    next_action: String
}

/// Asks an LLM for a JSON decision.
pub struct LlmReasoningOracle {
    llm: Arc<dyn LlmService>
}

impl LlmReasoningOracle {
    pub fn new(llm: Arc<dyn LlmService>) -> Self {
        Self { llm }
    }

    pub fn build_prompt(query: &str, context_chars: usize, last_step: &str) -> String {
        format!(
            "You are planning a medical retrieval task. Review the current state.\n\n\
             Original Query: {query}\n\
             Current Context Length: {context_chars} characters\n\
             Last Step: {last_step}\n\n\
             Decide whether the context is sufficient to answer the query, whether \
             retrieval should stop, and what information is still missing.\n\n\
             Respond with JSON only:\n\
             {{\"sufficient\": true/false, \"should_stop\": true/false, \
             \"missing_info\": \"...\", \"next_action\": \"...\"}}"
        )
    }
}

/// The substring between the first `{` and the last `}`, or the whole text.
fn json_slice(response: &str) -> &str {
    match (response.find('{'), response.rfind('}')) {
        (Some(start), Some(end)) if start < end => &response[start..=end],
        _ => response
    }
}

#[async_trait]
impl ReasoningOracle for LlmReasoningOracle {
    async fn decide(
        &self,
        query: &str,
        context_chars: usize,
        last_step: &str
    ) -> Result<ReasoningDecision, OracleError> {
        let prompt = Self::build_prompt(query, context_chars, last_step);
        let response = self.llm.generate(&prompt).await?;
        let parsed: LlmDecision = serde_json::from_str(json_slice(&response))?;
        debug!(
            "Oracle ({}) decided sufficient={} should_stop={}",
            self.llm.name(),
            parsed.sufficient,
            parsed.should_stop
        );

        Ok(ReasoningDecision {
            sufficient: parsed.sufficient,
            should_stop: parsed.should_stop,
            missing_info: parsed.missing_info,
            next_action: parsed.next_action,
            source: DecisionSource::Llm
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphrag::MockLlmService;

    #[test]
    fn test_heuristic_thresholds() {
        let oracle = HeuristicOracle::default();

        let short = oracle.evaluate(120);
        assert!(!short.sufficient);
        assert!(!short.should_stop);
        assert_eq!(short.missing_info, "Additional context may be needed");
        assert_eq!(short.next_action, "continue_retrieval");

        let medium = oracle.evaluate(700);
        assert!(medium.sufficient);
        assert!(!medium.should_stop);

        let long = oracle.evaluate(1500);
        assert!(long.should_stop);
        assert_eq!(long.missing_info, "");
        assert_eq!(long.next_action, "stop");
        assert_eq!(long.source, DecisionSource::Heuristic);
    }

    #[test]
    fn test_heuristic_boundaries_are_exclusive() {
        let oracle = HeuristicOracle::default();
        assert!(!oracle.evaluate(500).sufficient);
        assert!(oracle.evaluate(1001).should_stop);

        // At exactly the stop threshold the loop continues, but nothing is
        // reported missing and the suggested action is already "stop".
        let at_stop = oracle.evaluate(1000);
        assert!(!at_stop.should_stop);
        assert_eq!(at_stop.missing_info, "");
        assert_eq!(at_stop.next_action, "stop");
        assert_eq!(oracle.evaluate(999).next_action, "continue_retrieval");
    }

    #[test]
    fn test_json_slice() {
        assert_eq!(json_slice("Sure! {\"a\": 1} done"), "{\"a\": 1}");
        assert_eq!(json_slice("no json"), "no json");
        assert_eq!(json_slice("} backwards {"), "} backwards {");
    }

    #[tokio::test]
    async fn test_llm_oracle_parses_wrapped_json() {
        let llm = MockLlmService::new().with_default(
            "Here is my decision:\n{\"sufficient\": true, \"should_stop\": true, \
             \"missing_info\": \"\", \"next_action\": \"stop\"}\nThanks."
        );
        let oracle = LlmReasoningOracle::new(Arc::new(llm));

        let decision = oracle.decide("What causes fever?", 800, "graph_traversal").await.unwrap();
        assert!(decision.should_stop);
        assert_eq!(decision.next_action, "stop");
        assert_eq!(decision.source, DecisionSource::Llm);
    }

    #[tokio::test]
    async fn test_llm_oracle_prompt_carries_state() {
        let llm = Arc::new(
            MockLlmService::new().with_default("{\"sufficient\": false, \"should_stop\": false}")
        );
        let oracle = LlmReasoningOracle::new(llm.clone());

        let decision = oracle.decide("What causes fever?", 42, "vector_retrieval").await.unwrap();
        assert!(!decision.sufficient);
        assert_eq!(decision.missing_info, "");

        let prompts = llm.prompts().await;
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Original Query: What causes fever?"));
        assert!(prompts[0].contains("Current Context Length: 42 characters"));
        assert!(prompts[0].contains("Last Step: vector_retrieval"));
    }

    #[tokio::test]
    async fn test_llm_oracle_malformed_response() {
        let llm = MockLlmService::new().with_default("I think we should keep going.");
        let oracle = LlmReasoningOracle::new(Arc::new(llm));

        let err = oracle.decide("q", 10, "reasoning").await.unwrap_err();
        assert!(matches!(err, OracleError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_llm_oracle_provider_failure() {
        let llm = MockLlmService::new().failing();
        let oracle = LlmReasoningOracle::new(Arc::new(llm));

        let err = oracle.decide("q", 10, "reasoning").await.unwrap_err();
        assert!(matches!(err, OracleError::Provider(_)));
    }
}
