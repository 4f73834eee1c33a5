//! # Environment Variable Loader
//!
//! Loads configuration from environment variables following 12-factor app
//! principles.
//!
//! # Naming Convention
//! Every variable is prefixed with `MEDRAG_` followed by the section name:
//! `MEDRAG_STORE_*`, `MEDRAG_EMBEDDING_*`, `MEDRAG_LLM_*`, `MEDRAG_GRAPH_*`,
//! `MEDRAG_RETRIEVAL_*`, `MEDRAG_AGENT_*`, `MEDRAG_LOG_*`, `MEDRAG_METRICS_*`.

use crate::config::{
    AdjacencyMode, AgentConfig, Config, EmbeddingConfig, GraphConfig, LlmAuth, LlmConfig,
    LlmProviderConfig, LogFormat, ObservabilityConfig, RetrievalConfig, StoreConfig
};
use std::env;
use std::str::FromStr;

/// Load configuration from environment variables.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Environment variables override default values but can be overridden by
/// CLI arguments. Unparseable numeric or boolean values are ignored with a
/// warning and the default is kept.
///
/// ## Usage
/// ```rust,no_run
/// use config::load_from_env;
///
/// let config = load_from_env();
/// println!("Store: {}", config.store.url);
/// ```
///
/// ## Environment Variables
/// ### Store (`MEDRAG_STORE_*`)
/// - `MEDRAG_STORE_URL`, `MEDRAG_STORE_API_KEY`, `MEDRAG_STORE_COLLECTION`,
///   `MEDRAG_STORE_TIMEOUT_MS`
///
/// ### Embedding (`MEDRAG_EMBEDDING_*`)
/// - `MEDRAG_EMBEDDING_PROVIDER`, `MEDRAG_EMBEDDING_BASE_URL`,
///   `MEDRAG_EMBEDDING_MODEL`, `MEDRAG_EMBEDDING_DIMENSION`,
///   `MEDRAG_EMBEDDING_API_KEY`, `MEDRAG_EMBEDDING_TIMEOUT_MS`,
///   `MEDRAG_EMBEDDING_BATCH_SIZE`
///
/// ### LLM (`MEDRAG_LLM_*`)
/// A primary provider is configured when `MEDRAG_LLM_BASE_URL` is set, a
/// secondary one when `MEDRAG_LLM_FALLBACK_BASE_URL` is set:
/// - `MEDRAG_LLM_NAME`, `MEDRAG_LLM_BASE_URL`, `MEDRAG_LLM_MODEL`,
///   `MEDRAG_LLM_API_KEY`, `MEDRAG_LLM_AUTH` (bearer/x_auth_token/none)
/// - the same names with `MEDRAG_LLM_FALLBACK_` as prefix
///
/// ### Graph (`MEDRAG_GRAPH_*`)
/// - `MEDRAG_GRAPH_SIMILARITY_THRESHOLD`, `MEDRAG_GRAPH_FAN_OUT_CAP`,
///   `MEDRAG_GRAPH_ADJACENCY` (symmetric/directed), `MEDRAG_GRAPH_TILE_SIZE`
///
/// ### Retrieval (`MEDRAG_RETRIEVAL_*`)
/// - `MEDRAG_RETRIEVAL_TOP_K`, `MEDRAG_RETRIEVAL_MAX_DEPTH`,
///   `MEDRAG_RETRIEVAL_MAX_CONTEXT_NODES`, `MEDRAG_RETRIEVAL_CALL_TIMEOUT_MS`
///
/// ### Agent (`MEDRAG_AGENT_*`)
/// - `MEDRAG_AGENT_ENABLED`, `MEDRAG_AGENT_MAX_ITERATIONS`,
///   `MEDRAG_AGENT_REASONING_ENABLED`
///
/// ### Observability
/// - `MEDRAG_LOG_LEVEL`, `MEDRAG_LOG_FORMAT` (pretty/json),
///   `MEDRAG_METRICS_ENABLED`, `MEDRAG_METRICS_ADDR`
pub fn load_from_env() -> Config {
    Config {
        store: load_store_from_env(),
        embedding: load_embedding_from_env(),
        llm: load_llm_from_env(),
        graph: load_graph_from_env(),
        retrieval: load_retrieval_from_env(),
        agent: load_agent_from_env(),
        observability: load_observability_from_env()
    }
}

fn load_store_from_env() -> StoreConfig {
    let defaults = StoreConfig::default();
    StoreConfig {
        url: env::var("MEDRAG_STORE_URL").unwrap_or(defaults.url),
        api_key: env::var("MEDRAG_STORE_API_KEY").ok(),
        collection: env::var("MEDRAG_STORE_COLLECTION").unwrap_or(defaults.collection),
        timeout_ms: parse_or("MEDRAG_STORE_TIMEOUT_MS", defaults.timeout_ms)
    }
}

fn load_embedding_from_env() -> EmbeddingConfig {
    let defaults = EmbeddingConfig::default();
    EmbeddingConfig {
        provider: env::var("MEDRAG_EMBEDDING_PROVIDER").unwrap_or(defaults.provider),
        base_url: env::var("MEDRAG_EMBEDDING_BASE_URL").unwrap_or(defaults.base_url),
        model: env::var("MEDRAG_EMBEDDING_MODEL").unwrap_or(defaults.model),
        dimension: parse_or("MEDRAG_EMBEDDING_DIMENSION", defaults.dimension),
        api_key: env::var("MEDRAG_EMBEDDING_API_KEY").ok(),
        timeout_ms: parse_or("MEDRAG_EMBEDDING_TIMEOUT_MS", defaults.timeout_ms),
        batch_size: parse_or("MEDRAG_EMBEDDING_BATCH_SIZE", defaults.batch_size),
        cache_size: parse_or("MEDRAG_EMBEDDING_CACHE_SIZE", defaults.cache_size)
    }
}

fn load_llm_from_env() -> LlmConfig {
    let providers = ["MEDRAG_LLM", "MEDRAG_LLM_FALLBACK"]
        .iter()
        .filter_map(|prefix| load_llm_provider_from_env(prefix))
        .collect();
    LlmConfig { providers }
}

fn load_llm_provider_from_env(prefix: &str) -> Option<LlmProviderConfig> {
    let base_url = env::var(format!("{prefix}_BASE_URL")).ok()?;
    let name = env::var(format!("{prefix}_NAME")).unwrap_or_else(|_| {
        if prefix.ends_with("FALLBACK") {
            "fallback".to_string()
        } else {
            "primary".to_string()
        }
    });
    let model = env::var(format!("{prefix}_MODEL")).unwrap_or_else(|_| "deepseek-chat".to_string());

    let mut provider = LlmProviderConfig::new(&name, &base_url, &model);
    provider.api_key = env::var(format!("{prefix}_API_KEY")).ok();
    provider.auth = match env::var(format!("{prefix}_AUTH")).as_deref() {
        Ok("x_auth_token") => LlmAuth::XAuthToken,
        Ok("none") => LlmAuth::None,
        _ => LlmAuth::Bearer
    };
    provider.temperature = parse_or(&format!("{prefix}_TEMPERATURE"), provider.temperature);
    provider.max_tokens = parse_or(&format!("{prefix}_MAX_TOKENS"), provider.max_tokens);
    provider.timeout_ms = parse_or(&format!("{prefix}_TIMEOUT_MS"), provider.timeout_ms);
    Some(provider)
}

fn load_graph_from_env() -> GraphConfig {
    let defaults = GraphConfig::default();
    GraphConfig {
        similarity_threshold: parse_or(
            "MEDRAG_GRAPH_SIMILARITY_THRESHOLD",
            defaults.similarity_threshold
        ),
        fan_out_cap: parse_or("MEDRAG_GRAPH_FAN_OUT_CAP", defaults.fan_out_cap),
        adjacency: match env::var("MEDRAG_GRAPH_ADJACENCY").as_deref() {
            Ok("directed") => AdjacencyMode::Directed,
            Ok("symmetric") => AdjacencyMode::Symmetric,
            _ => defaults.adjacency
        },
        tile_size: parse_or("MEDRAG_GRAPH_TILE_SIZE", defaults.tile_size),
        write_batch_size: parse_or("MEDRAG_GRAPH_WRITE_BATCH_SIZE", defaults.write_batch_size),
        max_question_chars: parse_or("MEDRAG_GRAPH_MAX_QUESTION_CHARS", defaults.max_question_chars),
        max_answer_chars: parse_or("MEDRAG_GRAPH_MAX_ANSWER_CHARS", defaults.max_answer_chars)
    }
}

fn load_retrieval_from_env() -> RetrievalConfig {
    let defaults = RetrievalConfig::default();
    RetrievalConfig {
        top_k: parse_or("MEDRAG_RETRIEVAL_TOP_K", defaults.top_k),
        max_depth: parse_or("MEDRAG_RETRIEVAL_MAX_DEPTH", defaults.max_depth),
        max_context_nodes: parse_or(
            "MEDRAG_RETRIEVAL_MAX_CONTEXT_NODES",
            defaults.max_context_nodes
        ),
        max_context_edges: parse_or(
            "MEDRAG_RETRIEVAL_MAX_CONTEXT_EDGES",
            defaults.max_context_edges
        ),
        neighbors_per_node: parse_or(
            "MEDRAG_RETRIEVAL_NEIGHBORS_PER_NODE",
            defaults.neighbors_per_node
        ),
        call_timeout_ms: parse_or("MEDRAG_RETRIEVAL_CALL_TIMEOUT_MS", defaults.call_timeout_ms)
    }
}

fn load_agent_from_env() -> AgentConfig {
    let defaults = AgentConfig::default();
    AgentConfig {
        enabled: parse_or("MEDRAG_AGENT_ENABLED", defaults.enabled),
        max_iterations: parse_or("MEDRAG_AGENT_MAX_ITERATIONS", defaults.max_iterations),
        reasoning_enabled: parse_or("MEDRAG_AGENT_REASONING_ENABLED", defaults.reasoning_enabled),
        sufficient_chars: parse_or("MEDRAG_AGENT_SUFFICIENT_CHARS", defaults.sufficient_chars),
        stop_chars: parse_or("MEDRAG_AGENT_STOP_CHARS", defaults.stop_chars),
        oracle_timeout_ms: parse_or("MEDRAG_AGENT_ORACLE_TIMEOUT_MS", defaults.oracle_timeout_ms)
    }
}

fn load_observability_from_env() -> ObservabilityConfig {
    let defaults = ObservabilityConfig::default();
    ObservabilityConfig {
        log_level: env::var("MEDRAG_LOG_LEVEL")
            .map(|level| level.to_lowercase())
            .unwrap_or(defaults.log_level),
        log_format: match env::var("MEDRAG_LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("pretty") => LogFormat::Pretty,
            _ => defaults.log_format
        },
        metrics_enabled: parse_or("MEDRAG_METRICS_ENABLED", defaults.metrics_enabled),
        metrics_addr: env::var("MEDRAG_METRICS_ADDR").unwrap_or(defaults.metrics_addr)
    }
}

/// Parse an environment variable into `T`.
pub(crate) fn parse_env<T>(key: &str) -> Result<T, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: std::error::Error + 'static
{
    let value = env::var(key)?;
    Ok(value.trim().parse::<T>()?)
}

fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::error::Error + 'static
{
    match parse_env(key) {
        Ok(value) => value,
        Err(e) => {
            if env::var(key).is_ok() {
                tracing::warn!("Ignoring invalid value for {}: {}", key, e);
            }
            default
        }
    }
}
