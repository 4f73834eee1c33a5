//! Process wiring: configuration, logging, metrics, store and embedder.

use anyhow::Result;
use config::{Config, LogFormat, load_from_env, load_from_file, merge_configs, validate};
use errors::{ConfigurationError, StoreError};
use graphrag::{HttpEmbeddingService, MockEmbeddingService};
use rag_core::{EmbeddingService, GraphStore};
use std::path::Path;
use std::sync::Arc;
use storage::{InMemoryGraphStore, QdrantGraphStore};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::ux_error::{self, UxError};

/// Store URL scheme selecting the process-local store.
pub const MEMORY_STORE_SCHEME: &str = "memory://";

const DEFAULT_CONFIG_FILES: &[&str] = &["medrag.toml", "medrag.yaml", "medrag.yml"];

/// Defaults, then the config file, then `MEDRAG_*`, then `cli_overrides`.
///
/// Without an explicit path the first existing `medrag.{toml,yaml,yml}` in
/// the working directory is used.
pub fn load_config(path: Option<&Path>, cli_overrides: Option<Config>) -> Result<Config> {
    let discovered = DEFAULT_CONFIG_FILES
        .iter()
        .map(Path::new)
        .find(|candidate| candidate.exists());

    let file_config = match path.or(discovered) {
        Some(file) => load_from_file(file).map_err(|e| {
            ux_error::config_file_error(&file.display().to_string(), &e.to_string())
        })?,
        None => Config::default()
    };

    Ok(merge_configs(
        Config::default(),
        file_config,
        load_from_env(),
        cli_overrides
    ))
}

pub fn validated(config: &Config) -> Result<()> {
    validate(config).map_err(|e| match e {
        ConfigurationError::DimensionMismatch { embedding, store } => {
            ux_error::dimension_mismatch(embedding, store)
        }
        other => ux_error::config_error(&other.to_string())
    })?;
    Ok(())
}

/// Installs the global subscriber. Logs go to stderr so `--json` output on
/// stdout stays machine-readable.
pub fn init_tracing(config: &Config, verbose: bool) {
    let level = if verbose {
        "debug"
    } else {
        config.observability.log_level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match config.observability.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init()
    }
}

pub fn init_metrics(config: &Config) -> Result<()> {
    if !config.observability.metrics_enabled {
        return Ok(());
    }
    let addr = config
        .observability
        .metrics_addr
        .parse()
        .map_err(|e| ux_error::config_error(&format!("observability.metrics_addr: {e}")))?;
    graphrag::init_metrics_exporter(addr)
        .map_err(|e| anyhow::anyhow!("Failed to install metrics exporter: {e}"))?;
    tracing::info!("Prometheus exporter listening on {}", addr);
    Ok(())
}

pub fn build_embedder(config: &Config) -> Result<Arc<dyn EmbeddingService>> {
    match config.embedding.provider.as_str() {
        "mock" => Ok(Arc::new(MockEmbeddingService::new(config.embedding.dimension))),
        _ => {
            let service = HttpEmbeddingService::new(&config.embedding)
                .map_err(|e| ux_error::embedding_unavailable(&e.to_string()))?;
            Ok(Arc::new(service))
        }
    }
}

/// Concrete store behind the `GraphStore` trait object.
pub enum StoreHandle {
    Qdrant(Arc<QdrantGraphStore>),
    Memory(Arc<InMemoryGraphStore>)
}

impl StoreHandle {
    pub fn as_graph_store(&self) -> Arc<dyn GraphStore> {
        match self {
            Self::Qdrant(store) => store.clone(),
            Self::Memory(store) => store.clone()
        }
    }

    pub fn is_ephemeral(&self) -> bool {
        matches!(self, Self::Memory(_))
    }

    /// Dimension of the existing collection, `None` when it is missing.
    pub async fn collection_dimension(&self) -> Result<Option<usize>, StoreError> {
        match self {
            Self::Qdrant(store) => Ok(store
                .collection_dimension()
                .await?
                .and_then(|d| usize::try_from(d).ok())),
            Self::Memory(store) => Ok(Some(store.dimension()))
        }
    }
}

/// Opens the configured store sized for `config.embedding.dimension`.
pub async fn open_store(config: &Config) -> Result<StoreHandle> {
    let dimension = config.embedding.dimension;
    if config.store.url.starts_with(MEMORY_STORE_SCHEME) {
        return Ok(StoreHandle::Memory(Arc::new(InMemoryGraphStore::new(
            dimension
        ))));
    }

    let store = QdrantGraphStore::connect(&config.store, dimension)
        .await
        .map_err(|e| store_error(&config.store.url, e))?;
    Ok(StoreHandle::Qdrant(Arc::new(store)))
}

pub fn store_error(url: &str, err: StoreError) -> UxError {
    match err {
        StoreError::Configuration(ConfigurationError::DimensionMismatch { embedding, store }) => {
            ux_error::dimension_mismatch(embedding, store)
        }
        other => ux_error::store_unavailable(url, &other.to_string())
    }
}
