//! # Configuration Precedence
//!
//! Merges configuration from multiple sources with precedence rules.
//!
//! # Precedence Order
//! 1. CLI arguments (highest priority)
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values (lowest priority)
//!
//! A source only overrides a field when its value differs from the compiled
//! default, so a sparse higher-priority source never resets values set by a
//! lower-priority one.

use crate::config::{
    AgentConfig, Config, EmbeddingConfig, GraphConfig, ObservabilityConfig, RetrievalConfig,
    StoreConfig
};
use std::fmt::Debug;

/// Merge multiple configuration sources with precedence.
///
/// # M-CANONICAL-DOCS
///
/// ## Usage
/// ```rust,no_run
/// use config::{Config, load_from_env, load_from_file, merge_configs};
/// use std::path::Path;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let from_file = load_from_file(Path::new("medrag.toml"))?;
///     let from_env = load_from_env();
///     let _config = merge_configs(Config::default(), from_file, from_env, None);
///     Ok(())
/// }
/// ```
///
/// ## LLM Providers
/// The provider list is replaced as a whole by the highest-priority source
/// that defines a non-empty list.
pub fn merge_configs(
    defaults: Config,
    file_config: Config,
    env_config: Config,
    cli_config: Option<Config>
) -> Config {
    let mut config = merge_with_logging(defaults, file_config, "file");
    config = merge_with_logging(config, env_config, "env");

    if let Some(cli) = cli_config {
        config = merge_with_logging(config, cli, "cli");
    }

    config
}

fn merge_with_logging(mut base: Config, over: Config, source_name: &str) -> Config {
    let mut changes = Vec::new();

    merge_store(&mut base.store, &over.store, &mut changes);
    merge_embedding(&mut base.embedding, &over.embedding, &mut changes);
    merge_graph(&mut base.graph, &over.graph, &mut changes);
    merge_retrieval(&mut base.retrieval, &over.retrieval, &mut changes);
    merge_agent(&mut base.agent, &over.agent, &mut changes);
    merge_observability(&mut base.observability, &over.observability, &mut changes);

    if !over.llm.providers.is_empty() && over.llm.providers != base.llm.providers {
        changes.push(format!("llm.providers = [{} entries]", over.llm.providers.len()));
        base.llm.providers = over.llm.providers;
    }

    if !changes.is_empty() {
        tracing::info!("Configuration from {}: {:?}", source_name, changes);
    }

    base
}

fn merge_field<T>(base: &mut T, over: &T, default: &T, path: &str, changes: &mut Vec<String>)
where
    T: PartialEq + Clone + Debug
{
    if over != default && over != base {
        changes.push(format!("{path} = {over:?}"));
        *base = over.clone();
    }
}

fn merge_secret(
    base: &mut Option<String>,
    over: &Option<String>,
    path: &str,
    changes: &mut Vec<String>
) {
    if over.is_some() && over != base {
        changes.push(format!("{path} = ***"));
        base.clone_from(over);
    }
}

fn merge_store(base: &mut StoreConfig, over: &StoreConfig, changes: &mut Vec<String>) {
    let d = StoreConfig::default();
    merge_field(&mut base.url, &over.url, &d.url, "store.url", changes);
    merge_secret(&mut base.api_key, &over.api_key, "store.api_key", changes);
    merge_field(
        &mut base.collection,
        &over.collection,
        &d.collection,
        "store.collection",
        changes
    );
    merge_field(
        &mut base.timeout_ms,
        &over.timeout_ms,
        &d.timeout_ms,
        "store.timeout_ms",
        changes
    );
}

fn merge_embedding(base: &mut EmbeddingConfig, over: &EmbeddingConfig, changes: &mut Vec<String>) {
    let d = EmbeddingConfig::default();
    merge_field(
        &mut base.provider,
        &over.provider,
        &d.provider,
        "embedding.provider",
        changes
    );
    merge_field(
        &mut base.base_url,
        &over.base_url,
        &d.base_url,
        "embedding.base_url",
        changes
    );
    merge_field(&mut base.model, &over.model, &d.model, "embedding.model", changes);
    merge_field(
        &mut base.dimension,
        &over.dimension,
        &d.dimension,
        "embedding.dimension",
        changes
    );
    merge_secret(&mut base.api_key, &over.api_key, "embedding.api_key", changes);
    merge_field(
        &mut base.timeout_ms,
        &over.timeout_ms,
        &d.timeout_ms,
        "embedding.timeout_ms",
        changes
    );
    merge_field(
        &mut base.batch_size,
        &over.batch_size,
        &d.batch_size,
        "embedding.batch_size",
        changes
    );
    merge_field(
        &mut base.cache_size,
        &over.cache_size,
        &d.cache_size,
        "embedding.cache_size",
        changes
    );
}

fn merge_graph(base: &mut GraphConfig, over: &GraphConfig, changes: &mut Vec<String>) {
    let d = GraphConfig::default();
    merge_field(
        &mut base.similarity_threshold,
        &over.similarity_threshold,
        &d.similarity_threshold,
        "graph.similarity_threshold",
        changes
    );
    merge_field(
        &mut base.fan_out_cap,
        &over.fan_out_cap,
        &d.fan_out_cap,
        "graph.fan_out_cap",
        changes
    );
    merge_field(
        &mut base.adjacency,
        &over.adjacency,
        &d.adjacency,
        "graph.adjacency",
        changes
    );
    merge_field(
        &mut base.tile_size,
        &over.tile_size,
        &d.tile_size,
        "graph.tile_size",
        changes
    );
    merge_field(
        &mut base.write_batch_size,
        &over.write_batch_size,
        &d.write_batch_size,
        "graph.write_batch_size",
        changes
    );
    merge_field(
        &mut base.max_question_chars,
        &over.max_question_chars,
        &d.max_question_chars,
        "graph.max_question_chars",
        changes
    );
    merge_field(
        &mut base.max_answer_chars,
        &over.max_answer_chars,
        &d.max_answer_chars,
        "graph.max_answer_chars",
        changes
    );
}

fn merge_retrieval(base: &mut RetrievalConfig, over: &RetrievalConfig, changes: &mut Vec<String>) {
    let d = RetrievalConfig::default();
    merge_field(&mut base.top_k, &over.top_k, &d.top_k, "retrieval.top_k", changes);
    merge_field(
        &mut base.max_depth,
        &over.max_depth,
        &d.max_depth,
        "retrieval.max_depth",
        changes
    );
    merge_field(
        &mut base.max_context_nodes,
        &over.max_context_nodes,
        &d.max_context_nodes,
        "retrieval.max_context_nodes",
        changes
    );
    merge_field(
        &mut base.max_context_edges,
        &over.max_context_edges,
        &d.max_context_edges,
        "retrieval.max_context_edges",
        changes
    );
    merge_field(
        &mut base.neighbors_per_node,
        &over.neighbors_per_node,
        &d.neighbors_per_node,
        "retrieval.neighbors_per_node",
        changes
    );
    merge_field(
        &mut base.call_timeout_ms,
        &over.call_timeout_ms,
        &d.call_timeout_ms,
        "retrieval.call_timeout_ms",
        changes
    );
}

fn merge_agent(base: &mut AgentConfig, over: &AgentConfig, changes: &mut Vec<String>) {
    let d = AgentConfig::default();
    merge_field(&mut base.enabled, &over.enabled, &d.enabled, "agent.enabled", changes);
    merge_field(
        &mut base.max_iterations,
        &over.max_iterations,
        &d.max_iterations,
        "agent.max_iterations",
        changes
    );
    merge_field(
        &mut base.reasoning_enabled,
        &over.reasoning_enabled,
        &d.reasoning_enabled,
        "agent.reasoning_enabled",
        changes
    );
    merge_field(
        &mut base.sufficient_chars,
        &over.sufficient_chars,
        &d.sufficient_chars,
        "agent.sufficient_chars",
        changes
    );
    merge_field(
        &mut base.stop_chars,
        &over.stop_chars,
        &d.stop_chars,
        "agent.stop_chars",
        changes
    );
    merge_field(
        &mut base.oracle_timeout_ms,
        &over.oracle_timeout_ms,
        &d.oracle_timeout_ms,
        "agent.oracle_timeout_ms",
        changes
    );
}

fn merge_observability(
    base: &mut ObservabilityConfig,
    over: &ObservabilityConfig,
    changes: &mut Vec<String>
) {
    let d = ObservabilityConfig::default();
    merge_field(
        &mut base.log_level,
        &over.log_level,
        &d.log_level,
        "observability.log_level",
        changes
    );
    merge_field(
        &mut base.log_format,
        &over.log_format,
        &d.log_format,
        "observability.log_format",
        changes
    );
    merge_field(
        &mut base.metrics_enabled,
        &over.metrics_enabled,
        &d.metrics_enabled,
        "observability.metrics_enabled",
        changes
    );
    merge_field(
        &mut base.metrics_addr,
        &over.metrics_addr,
        &d.metrics_addr,
        "observability.metrics_addr",
        changes
    );
}
