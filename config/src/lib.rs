//! # Configuration System
//!
//! Centralized configuration management for the medical GraphRAG system.
//!
//! This crate provides:
//! - Configuration structures for every component
//! - Environment variable loading (12-factor app principles)
//! - Configuration file loading (TOML/YAML)
//! - Configuration precedence (CLI > env > file > defaults)
//! - Configuration validation, including the embedding dimension check

pub mod config;
pub mod file_loader;
pub mod loader;
pub mod precedence;
pub mod validation;

pub use config::{
    AdjacencyMode, AgentConfig, Config, EmbeddingConfig, GraphConfig, LlmAuth, LlmConfig,
    LlmProviderConfig, LogFormat, ObservabilityConfig, RetrievalConfig, StoreConfig
};
pub use file_loader::{ConfigFileError, load_from_file, load_from_toml, load_from_yaml};
pub use loader::load_from_env;
pub use precedence::merge_configs;
pub use validation::{known_model_dimension, require_llm, validate};
