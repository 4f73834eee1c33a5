//! # Configuration Validation
//!
//! Field-level rules come from the `validator` derive on each section.
//! This module adds the cross-field rules that a single field cannot express.

use crate::config::Config;
use errors::ConfigurationError;
use validator::Validate;

/// Validate configuration structure.
///
/// # M-CANONICAL-DOCS
///
/// ## Validation Rules
/// ### Field Level
/// - `graph.similarity_threshold`: 0.0-1.0
/// - `graph.fan_out_cap`: 1-1000
/// - `agent.max_iterations`: 1-100
/// - `observability.log_level`: trace/debug/info/warn/error
/// - every LLM provider: non-empty name, base URL and model
///
/// ### Cross Field
/// - `agent.sufficient_chars` must not exceed `agent.stop_chars`
/// - LLM provider names must be unique
/// - `embedding.dimension` must match the known dimension of well-known models
pub fn validate(config: &Config) -> Result<(), ConfigurationError> {
    config
        .validate()
        .map_err(|e| ConfigurationError::InvalidValue {
            field: "config".to_string(),
            reason: e.to_string()
        })?;

    if config.agent.sufficient_chars > config.agent.stop_chars {
        return Err(ConfigurationError::InvalidValue {
            field: "agent.sufficient_chars".to_string(),
            reason: format!(
                "must not exceed agent.stop_chars ({} > {})",
                config.agent.sufficient_chars, config.agent.stop_chars
            )
        });
    }

    let mut seen = std::collections::HashSet::new();
    for provider in &config.llm.providers {
        if !seen.insert(provider.name.as_str()) {
            return Err(ConfigurationError::InvalidValue {
                field: "llm.providers".to_string(),
                reason: format!("duplicate provider name {}", provider.name)
            });
        }
    }

    if let Some(expected) = known_model_dimension(&config.embedding.model) {
        if expected != config.embedding.dimension {
            return Err(ConfigurationError::DimensionMismatch {
                embedding: expected,
                store: config.embedding.dimension
            });
        }
    }

    Ok(())
}

/// Require at least one LLM provider. Only commands that generate answers
/// need this.
pub fn require_llm(config: &Config) -> Result<(), ConfigurationError> {
    if config.llm.providers.is_empty() {
        return Err(ConfigurationError::MissingCredentials {
            component: "llm".to_string(),
            hint: "set MEDRAG_LLM_BASE_URL or add [[llm.providers]] to the config file".to_string()
        });
    }
    Ok(())
}

/// Output dimension of commonly deployed embedding models.
pub fn known_model_dimension(model: &str) -> Option<usize> {
    let name = model.rsplit('/').next().unwrap_or(model);
    match name {
        "all-mpnet-base-v2" | "multi-qa-mpnet-base-dot-v1" => Some(768),
        "all-MiniLM-L6-v2" | "all-MiniLM-L12-v2" | "paraphrase-MiniLM-L6-v2" => Some(384),
        "text-embedding-3-small" | "text-embedding-ada-002" => Some(1536),
        "text-embedding-3-large" => Some(3072),
        _ => None
    }
}
