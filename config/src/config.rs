//! # Configuration Structures
//!
//! This module defines all configuration structures for the medical
//! GraphRAG system.
//!
//! All configuration structures:
//! - Use `serde` for serialization/deserialization
//! - Use `validator` for field-level validation
//! - Default every field so partial files and sparse environments work

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Main configuration structure.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Aggregates the settings of the store adapter, the embedding and LLM
/// capabilities, the offline graph builder, the online retriever, the
/// iterative agent and observability.
///
/// ## Usage
/// ```rust,no_run
/// use config::Config;
///
/// let config = Config::default();
/// println!("Collection: {}", config.store.collection);
/// ```
///
/// ## Validation
/// All nested configurations must pass their own validation rules.
/// Cross-field rules live in [`crate::validation::validate`].
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    #[validate(nested)]
    pub store: StoreConfig,

    #[serde(default)]
    #[validate(nested)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    #[validate(nested)]
    pub llm: LlmConfig,

    #[serde(default)]
    #[validate(nested)]
    pub graph: GraphConfig,

    #[serde(default)]
    #[validate(nested)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    #[validate(nested)]
    pub agent: AgentConfig,

    #[serde(default)]
    #[validate(nested)]
    pub observability: ObservabilityConfig
}

/// Vector/graph store connection.
///
/// # M-CANONICAL-DOCS
///
/// ## Fields
/// - `url`: Qdrant gRPC endpoint (default: "http://localhost:6334")
/// - `api_key`: Optional API key
/// - `collection`: Collection holding the graph (default: "medical_knowledge_base")
/// - `timeout_ms`: Per-call timeout (default: 10000)
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct StoreConfig {
    #[serde(default = "default_store_url")]
    #[validate(length(min = 1, max = 2048))]
    pub url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_collection")]
    #[validate(length(min = 1, max = 255))]
    pub collection: String,

    #[serde(default = "default_store_timeout_ms")]
    #[validate(range(min = 100, max = 300000))]
    pub timeout_ms: u64
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_store_url(),
            api_key: None,
            collection: default_collection(),
            timeout_ms: default_store_timeout_ms()
        }
    }
}

fn default_store_url() -> String {
    "http://localhost:6334".to_string()
}

fn default_collection() -> String {
    "medical_knowledge_base".to_string()
}

fn default_store_timeout_ms() -> u64 {
    10_000
}

/// Embedding capability.
///
/// # M-CANONICAL-DOCS
///
/// ## Fields
/// - `provider`: "http" (OpenAI-compatible endpoint) or "mock"
/// - `base_url`: Endpoint base (default: "http://localhost:8080/v1")
/// - `model`: Model name (default: "sentence-transformers/all-mpnet-base-v2")
/// - `dimension`: Output dimension, must match the store (default: 768)
/// - `api_key`: Optional bearer token
/// - `timeout_ms`: Per-call timeout (default: 30000)
/// - `batch_size`: Texts per embedding request during builds (default: 50)
/// - `cache_size`: LRU entries for single-text embeddings (default: 1024)
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    #[validate(custom(function = "validate_embedding_provider"))]
    pub provider: String,

    #[serde(default = "default_embedding_base_url")]
    #[validate(length(min = 1, max = 2048))]
    pub base_url: String,

    #[serde(default = "default_embedding_model")]
    #[validate(length(min = 1, max = 255))]
    pub model: String,

    #[serde(default = "default_embedding_dimension")]
    #[validate(range(min = 1, max = 65536))]
    pub dimension: usize,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_embedding_timeout_ms")]
    #[validate(range(min = 100, max = 600000))]
    pub timeout_ms: u64,

    #[serde(default = "default_embedding_batch_size")]
    #[validate(range(min = 1, max = 4096))]
    pub batch_size: usize,

    #[serde(default = "default_embedding_cache_size")]
    pub cache_size: usize
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            base_url: default_embedding_base_url(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            api_key: None,
            timeout_ms: default_embedding_timeout_ms(),
            batch_size: default_embedding_batch_size(),
            cache_size: default_embedding_cache_size()
        }
    }
}

fn default_embedding_provider() -> String {
    "http".to_string()
}

fn default_embedding_base_url() -> String {
    "http://localhost:8080/v1".to_string()
}

fn default_embedding_model() -> String {
    "sentence-transformers/all-mpnet-base-v2".to_string()
}

fn default_embedding_dimension() -> usize {
    768
}

fn default_embedding_timeout_ms() -> u64 {
    30_000
}

fn default_embedding_batch_size() -> usize {
    50
}

fn default_embedding_cache_size() -> usize {
    1024
}

fn validate_embedding_provider(value: &str) -> Result<(), validator::ValidationError> {
    match value {
        "http" | "mock" => Ok(()),
        _ => Err(validator::ValidationError::new("Invalid embedding provider"))
    }
}

/// Ordered LLM fallback chain. The first provider is the primary.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default, PartialEq)]
pub struct LlmConfig {
    #[serde(default)]
    #[validate(nested)]
    pub providers: Vec<LlmProviderConfig>
}

/// How a provider authenticates requests.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LlmAuth {
    #[default]
    Bearer,
    XAuthToken,
    None
}

/// One OpenAI-compatible chat completion endpoint.
///
/// # M-CANONICAL-DOCS
///
/// ## Fields
/// - `name`: Label used in logs and metrics
/// - `base_url`: Endpoint base, with or without a trailing `/v1`
/// - `model`: Model name sent in the request
/// - `api_key`: Credential, sent according to `auth`
/// - `auth`: "bearer" (Authorization header) or "x_auth_token" (X-Auth-Token header)
/// - `temperature`: Sampling temperature (default: 0.2)
/// - `max_tokens`: Completion budget (default: 2048)
/// - `timeout_ms`: Per-call timeout (default: 60000)
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct LlmProviderConfig {
    #[validate(length(min = 1, max = 64))]
    pub name: String,

    #[validate(length(min = 1, max = 2048))]
    pub base_url: String,

    #[validate(length(min = 1, max = 255))]
    pub model: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub auth: LlmAuth,

    #[serde(default = "default_temperature")]
    #[validate(range(min = 0.0, max = 2.0))]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    #[validate(range(min = 1, max = 131072))]
    pub max_tokens: u32,

    #[serde(default = "default_llm_timeout_ms")]
    #[validate(range(min = 100, max = 600000))]
    pub timeout_ms: u64
}

impl LlmProviderConfig {
    pub fn new(name: &str, base_url: &str, model: &str) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.to_string(),
            model: model.to_string(),
            api_key: None,
            auth: LlmAuth::default(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_ms: default_llm_timeout_ms()
        }
    }
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_llm_timeout_ms() -> u64 {
    60_000
}

/// How the builder turns per-node top-K lists into adjacency lists.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AdjacencyMode {
    /// Every stored edge appears on both endpoints; both stay within the cap.
    #[default]
    Symmetric,
    /// Each node keeps its own top-K outgoing edges.
    Directed
}

/// Offline graph construction.
///
/// # M-CANONICAL-DOCS
///
/// ## Fields
/// - `similarity_threshold`: Minimum cosine similarity for an edge (default: 0.7)
/// - `fan_out_cap`: Maximum `related_nodes` per node (default: 20)
/// - `adjacency`: "symmetric" or "directed" (default: "symmetric")
/// - `tile_size`: Rows per similarity tile (default: 256)
/// - `write_batch_size`: Records per store upsert (default: 100)
/// - `max_question_chars` / `max_answer_chars`: Ingestion truncation caps
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct GraphConfig {
    #[serde(default = "default_similarity_threshold")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub similarity_threshold: f32,

    #[serde(default = "default_fan_out_cap")]
    #[validate(range(min = 1, max = 1000))]
    pub fan_out_cap: usize,

    #[serde(default)]
    pub adjacency: AdjacencyMode,

    #[serde(default = "default_tile_size")]
    #[validate(range(min = 1, max = 65536))]
    pub tile_size: usize,

    #[serde(default = "default_write_batch_size")]
    #[validate(range(min = 1, max = 10000))]
    pub write_batch_size: usize,

    #[serde(default = "default_max_question_chars")]
    #[validate(range(min = 1))]
    pub max_question_chars: usize,

    #[serde(default = "default_max_answer_chars")]
    #[validate(range(min = 1))]
    pub max_answer_chars: usize
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            fan_out_cap: default_fan_out_cap(),
            adjacency: AdjacencyMode::default(),
            tile_size: default_tile_size(),
            write_batch_size: default_write_batch_size(),
            max_question_chars: default_max_question_chars(),
            max_answer_chars: default_max_answer_chars()
        }
    }
}

fn default_similarity_threshold() -> f32 {
    0.7
}

fn default_fan_out_cap() -> usize {
    20
}

fn default_tile_size() -> usize {
    256
}

fn default_write_batch_size() -> usize {
    100
}

fn default_max_question_chars() -> usize {
    5000
}

fn default_max_answer_chars() -> usize {
    10000
}

/// Online retrieval.
///
/// # M-CANONICAL-DOCS
///
/// ## Fields
/// - `top_k`: Seed search size (default: 5)
/// - `max_depth`: BFS rounds (default: 2)
/// - `max_context_nodes`: Nodes rendered into the context (default: 10)
/// - `max_context_edges`: Edges listed in the provenance section (default: 5)
/// - `neighbors_per_node`: Adjacency entries read per node during BFS (default: 20)
/// - `call_timeout_ms`: Per store call timeout (default: 10000)
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    #[validate(range(min = 1, max = 1000))]
    pub top_k: usize,

    #[serde(default = "default_max_depth")]
    #[validate(range(max = 10))]
    pub max_depth: usize,

    #[serde(default = "default_max_context_nodes")]
    #[validate(range(min = 1, max = 1000))]
    pub max_context_nodes: usize,

    #[serde(default = "default_max_context_edges")]
    pub max_context_edges: usize,

    #[serde(default = "default_neighbors_per_node")]
    #[validate(range(min = 1, max = 1000))]
    pub neighbors_per_node: usize,

    #[serde(default = "default_call_timeout_ms")]
    #[validate(range(min = 10, max = 300000))]
    pub call_timeout_ms: u64
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_depth: default_max_depth(),
            max_context_nodes: default_max_context_nodes(),
            max_context_edges: default_max_context_edges(),
            neighbors_per_node: default_neighbors_per_node(),
            call_timeout_ms: default_call_timeout_ms()
        }
    }
}

fn default_top_k() -> usize {
    5
}

fn default_max_depth() -> usize {
    2
}

fn default_max_context_nodes() -> usize {
    10
}

fn default_max_context_edges() -> usize {
    5
}

fn default_neighbors_per_node() -> usize {
    20
}

fn default_call_timeout_ms() -> u64 {
    10_000
}

/// Iterative agent loop.
///
/// # M-CANONICAL-DOCS
///
/// ## Fields
/// - `enabled`: Use the planner/executor instead of a single retrieval (default: true)
/// - `max_iterations`: Loop bound (default: 5)
/// - `reasoning_enabled`: Consult the reasoning oracle between steps (default: true)
/// - `sufficient_chars`: Heuristic "sufficient" threshold (default: 500)
/// - `stop_chars`: Heuristic "stop" threshold (default: 1000)
/// - `oracle_timeout_ms`: Timeout for one oracle call (default: 30000)
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct AgentConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_max_iterations")]
    #[validate(range(min = 1, max = 100))]
    pub max_iterations: usize,

    #[serde(default = "default_true")]
    pub reasoning_enabled: bool,

    #[serde(default = "default_sufficient_chars")]
    pub sufficient_chars: usize,

    #[serde(default = "default_stop_chars")]
    pub stop_chars: usize,

    #[serde(default = "default_oracle_timeout_ms")]
    #[validate(range(min = 10, max = 600000))]
    pub oracle_timeout_ms: u64
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_iterations: default_max_iterations(),
            reasoning_enabled: true,
            sufficient_chars: default_sufficient_chars(),
            stop_chars: default_stop_chars(),
            oracle_timeout_ms: default_oracle_timeout_ms()
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_iterations() -> usize {
    5
}

fn default_sufficient_chars() -> usize {
    500
}

fn default_stop_chars() -> usize {
    1000
}

fn default_oracle_timeout_ms() -> u64 {
    30_000
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json
}

/// Observability configuration.
///
/// # M-CANONICAL-DOCS
///
/// ## Fields
/// - `log_level`: trace/debug/info/warn/error (default: "info")
/// - `log_format`: "pretty" or "json" (default: "pretty")
/// - `metrics_enabled`: Install the Prometheus exporter (default: false)
/// - `metrics_addr`: Exporter listen address (default: "0.0.0.0:9090")
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    #[validate(custom(function = "validate_logging_level"))]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,

    #[serde(default)]
    pub metrics_enabled: bool,

    #[serde(default = "default_metrics_addr")]
    #[validate(custom(function = "validate_socket_addr"))]
    pub metrics_addr: String
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            metrics_enabled: false,
            metrics_addr: default_metrics_addr()
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9090".to_string()
}

fn validate_logging_level(value: &str) -> Result<(), validator::ValidationError> {
    match value {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(validator::ValidationError::new("Invalid logging level"))
    }
}

fn validate_socket_addr(value: &str) -> Result<(), validator::ValidationError> {
    value
        .parse::<std::net::SocketAddr>()
        .map(|_| ())
        .map_err(|_| validator::ValidationError::new("Invalid socket address"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.store.collection, "medical_knowledge_base");
        assert_eq!(config.embedding.dimension, 768);
        assert_eq!(config.graph.similarity_threshold, 0.7);
        assert_eq!(config.graph.fan_out_cap, 20);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.retrieval.max_depth, 2);
        assert_eq!(config.retrieval.max_context_nodes, 10);
        assert_eq!(config.agent.max_iterations, 5);
        assert_eq!(config.agent.sufficient_chars, 500);
        assert_eq!(config.agent.stop_chars, 1000);
        assert!(config.llm.providers.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [graph]
            similarity_threshold = 0.85
            adjacency = "directed"

            [[llm.providers]]
            name = "deepseek"
            base_url = "https://api.deepseek.com"
            model = "deepseek-chat"
            auth = "bearer"
            "#
        )
        .unwrap();

        assert_eq!(config.graph.similarity_threshold, 0.85);
        assert_eq!(config.graph.adjacency, AdjacencyMode::Directed);
        assert_eq!(config.graph.fan_out_cap, 20);
        assert_eq!(config.llm.providers.len(), 1);
        assert_eq!(config.llm.providers[0].temperature, 0.2);
        assert_eq!(config.llm.providers[0].max_tokens, 2048);
    }

    #[test]
    fn test_field_validation() {
        let mut config = Config::default();
        config.graph.similarity_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.agent.max_iterations = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.observability.log_level = "verbose".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.embedding.provider = "onnx".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config
            .llm
            .providers
            .push(LlmProviderConfig::new("", "http://x", "m"));
        assert!(config.validate().is_err());
    }
}
