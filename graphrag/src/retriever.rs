//! Query-time retrieval: seed search on the combined embedding, then
//! level-synchronous breadth-first expansion over `related_nodes`.

use config::RetrievalConfig;
use errors::{ConfigurationError, StoreError};
use rag_core::{GraphStore, QaRecord, RetrievalResult, RetrievedNode, TraversedEdge, VectorField};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

use crate::context::render_context;
use crate::telemetry::GraphRagTelemetry;

#[derive(Debug, Clone, PartialEq)]
pub struct RetrieverSettings {
    pub top_k: usize,
    pub max_depth: usize,
    pub max_context_nodes: usize,
    pub max_context_edges: usize,
    /// Adjacency entries followed per node during expansion.
    pub neighbors_per_node: usize,
    pub call_timeout: Duration
}

impl Default for RetrieverSettings {
    fn default() -> Self {
        Self::from(&RetrievalConfig::default())
    }
}

impl From<&RetrievalConfig> for RetrieverSettings {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            top_k: config.top_k,
            max_depth: config.max_depth,
            max_context_nodes: config.max_context_nodes,
            max_context_edges: config.max_context_edges,
            neighbors_per_node: config.neighbors_per_node,
            call_timeout: Duration::from_millis(config.call_timeout_ms)
        }
    }
}

/// Read-only retriever over a [`GraphStore`].
///
/// Store failures and timeouts never surface as errors: seed failures give
/// an empty result, expansion failures give whatever was collected so far.
pub struct GraphRetriever {
    store: Arc<dyn GraphStore>,
    settings: RetrieverSettings,
    telemetry: GraphRagTelemetry
}

struct FrontierNode {
    id: String,
    related: Vec<String>
}

impl GraphRetriever {
    /// # Errors
    ///
    /// [`ConfigurationError::DimensionMismatch`] when query embeddings of
    /// `embedding_dimension` cannot be searched in `store`.
    pub fn new(
        store: Arc<dyn GraphStore>,
        embedding_dimension: usize,
        settings: RetrieverSettings
    ) -> Result<Self, ConfigurationError> {
        if store.dimension() != embedding_dimension {
            return Err(ConfigurationError::DimensionMismatch {
                embedding: embedding_dimension,
                store: store.dimension()
            });
        }
        Ok(Self {
            store,
            settings,
            telemetry: GraphRagTelemetry::new()
        })
    }

    pub fn settings(&self) -> &RetrieverSettings {
        &self.settings
    }

    /// Retrieval with the configured `top_k` and `max_depth`.
    pub async fn retrieve(&self, query_embedding: &[f32]) -> RetrievalResult {
        self.retrieve_graph_context(query_embedding, self.settings.top_k, self.settings.max_depth)
            .await
    }

    /// Seed-only retrieval, equivalent to `max_depth = 0`.
    pub async fn retrieve_vector_context(
        &self,
        query_embedding: &[f32],
        top_k: usize
    ) -> RetrievalResult {
        self.retrieve_graph_context(query_embedding, top_k, 0).await
    }

    #[instrument(skip(self, query_embedding), fields(backend = self.store.backend_name()))]
    pub async fn retrieve_graph_context(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        max_depth: usize
    ) -> RetrievalResult {
        let started = Instant::now();

        if query_embedding.len() != self.store.dimension() {
            warn!(
                "Query embedding has {} dimensions, store expects {}",
                query_embedding.len(),
                self.store.dimension()
            );
            return RetrievalResult::empty();
        }
        if top_k == 0 {
            return RetrievalResult::empty();
        }

        let seeds = match self
            .with_timeout(
                "search",
                self.store
                    .search(VectorField::Combined, query_embedding, top_k)
            )
            .await
        {
            Ok(seeds) => seeds,
            Err(e) => {
                warn!("Seed search failed, returning empty context: {}", e);
                self.telemetry.record_store_failure("search");
                return RetrievalResult::empty();
            }
        };

        let mut visited: HashSet<String> = HashSet::new();
        let mut nodes = Vec::with_capacity(seeds.len());
        let mut frontier = Vec::with_capacity(seeds.len());
        for hit in seeds {
            if visited.insert(hit.record.id.clone()) {
                frontier.push(FrontierNode {
                    id: hit.record.id.clone(),
                    related: hit.record.related_nodes.clone()
                });
                nodes.push(RetrievedNode::seed(hit.record, hit.similarity));
            }
        }
        let seed_count = nodes.len();

        let mut edges = Vec::new();
        let mut depth_reached = 0;
        for depth in 1..=max_depth {
            if frontier.is_empty() {
                break;
            }

            let mut discovered: Vec<(String, String)> = Vec::new();
            for node in &frontier {
                for neighbor in node.related.iter().take(self.settings.neighbors_per_node) {
                    if visited.insert(neighbor.clone()) {
                        discovered.push((node.id.clone(), neighbor.clone()));
                    }
                }
            }
            if discovered.is_empty() {
                break;
            }

            let ids: Vec<String> = discovered.iter().map(|(_, target)| target.clone()).collect();
            let mut fetched: HashMap<String, QaRecord> =
                match self.with_timeout("get_many", self.store.get_many(&ids)).await {
                    Ok(records) => records.into_iter().map(|r| (r.id.clone(), r)).collect(),
                    Err(e) => {
                        warn!("Expansion at depth {} failed, keeping partial result: {}", depth, e);
                        self.telemetry.record_store_failure("get_many");
                        break;
                    }
                };

            let mut next = Vec::new();
            for (source, target) in discovered {
                let Some(record) = fetched.remove(&target) else {
                    debug!("Skipping dangling neighbour {} of {}", target, source);
                    continue;
                };
                next.push(FrontierNode {
                    id: record.id.clone(),
                    related: record.related_nodes.clone()
                });
                edges.push(TraversedEdge {
                    source_id: source,
                    target_id: target
                });
                nodes.push(RetrievedNode::traversal(record, depth));
            }

            if !next.is_empty() {
                depth_reached = depth;
            }
            debug!("Depth {}: {} new nodes", depth, next.len());
            frontier = next;
        }

        let context = render_context(
            &nodes,
            &edges,
            self.settings.max_context_nodes,
            self.settings.max_context_edges
        );

        self.telemetry.record_retrieval(
            seed_count,
            nodes.len() - seed_count,
            edges.len(),
            started.elapsed().as_secs_f64() * 1000.0
        );

        RetrievalResult {
            nodes,
            edges,
            context,
            depth_reached
        }
    }

    async fn with_timeout<T>(
        &self,
        operation: &str,
        call: impl Future<Output = Result<T, StoreError>>
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.settings.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout {
                operation: operation.to_string(),
                timeout_ms: u64::try_from(self.settings.call_timeout.as_millis())
                    .unwrap_or(u64::MAX)
            })
        }
    }
}
