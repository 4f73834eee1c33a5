//! Offline graph construction: embed, link, persist.

use config::{AdjacencyMode, Config};
use errors::{BuildError, ConfigurationError, ProviderError, StoreError};
use rag_core::{BuildReport, EmbeddingService, GraphStore, NodeEmbeddings, QaRecord, VectorField};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::corpus::CorpusEntry;
use crate::similarity::{SimilarityParams, build_similarity_graph};
use crate::telemetry::GraphRagTelemetry;

/// Parameters of one build run.
///
/// # M-CANONICAL-DOCS
///
/// ## Fields
/// - `similarity_threshold`: Minimum cosine similarity for an edge, in [0, 1]
/// - `batch_size`: Records per embedding batch
/// - `fan_out_cap`: Maximum adjacency list length per node
/// - `adjacency`: Symmetric (edge on both endpoints) or directed top-K
/// - `drop_existing`: Delete and recreate the collection before writing
/// - `tile_size`: Rows and columns per similarity tile
/// - `write_batch_size`: Records per store upsert
/// - `max_question_chars` / `max_answer_chars`: Truncation caps applied on ingestion
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOptions {
    pub similarity_threshold: f32,
    pub batch_size: usize,
    pub fan_out_cap: usize,
    pub adjacency: AdjacencyMode,
    pub drop_existing: bool,
    pub tile_size: usize,
    pub write_batch_size: usize,
    pub max_question_chars: usize,
    pub max_answer_chars: usize
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl BuildOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            similarity_threshold: config.graph.similarity_threshold,
            batch_size: config.embedding.batch_size,
            fan_out_cap: config.graph.fan_out_cap,
            adjacency: config.graph.adjacency,
            drop_existing: false,
            tile_size: config.graph.tile_size,
            write_batch_size: config.graph.write_batch_size,
            max_question_chars: config.graph.max_question_chars,
            max_answer_chars: config.graph.max_answer_chars
        }
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        let invalid = |field: &str, reason: &str| ConfigurationError::InvalidValue {
            field: field.to_string(),
            reason: reason.to_string()
        };

        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(invalid("similarity_threshold", "must be within [0, 1]"));
        }
        if self.batch_size == 0 {
            return Err(invalid("batch_size", "must be at least 1"));
        }
        if self.fan_out_cap == 0 {
            return Err(invalid("fan_out_cap", "must be at least 1"));
        }
        if self.write_batch_size == 0 {
            return Err(invalid("write_batch_size", "must be at least 1"));
        }
        Ok(())
    }
}

/// Text embedded for the combined vector.
pub fn combined_text(question: &str, answer: &str) -> String {
    format!("Question: {question}\nAnswer: {answer}")
}

/// Cuts `text` to at most `max_chars` characters.
fn truncate_chars(text: &str, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => (text[..byte_index].to_string(), true),
        None => (text.to_string(), false)
    }
}

struct PendingRecord {
    id: String,
    question: String,
    answer: String,
    metadata: HashMap<String, Value>
}

/// Sole writer of a collection: embeds a corpus, derives the similarity
/// graph and upserts every node with its adjacency list.
pub struct GraphBuilder {
    store: Arc<dyn GraphStore>,
    embedder: Arc<dyn EmbeddingService>,
    telemetry: GraphRagTelemetry
}

impl GraphBuilder {
    /// # Errors
    ///
    /// [`ConfigurationError::DimensionMismatch`] when the embedding model and
    /// the store disagree on the vector dimension.
    pub fn new(
        store: Arc<dyn GraphStore>,
        embedder: Arc<dyn EmbeddingService>
    ) -> Result<Self, BuildError> {
        if embedder.dimension() != store.dimension() {
            return Err(ConfigurationError::DimensionMismatch {
                embedding: embedder.dimension(),
                store: store.dimension()
            }
            .into());
        }

        Ok(Self {
            store,
            embedder,
            telemetry: GraphRagTelemetry::new()
        })
    }

    /// Runs a full build.
    ///
    /// Fatal: invalid options, an unreachable store at start, schema or
    /// dimension mismatches. Everything else (blank rows, duplicate ids,
    /// failed embedding batches, failed write batches) is skipped and counted
    /// in the returned report.
    #[instrument(skip(self, corpus, options), fields(records = corpus.len(), backend = self.store.backend_name()))]
    pub async fn build(
        &self,
        corpus: &[CorpusEntry],
        options: &BuildOptions
    ) -> Result<BuildReport, BuildError> {
        let started = Instant::now();
        options.validate()?;

        let mut report = BuildReport {
            total_input: corpus.len(),
            ..BuildReport::default()
        };

        self.prepare_collection(options, &mut report).await?;

        let pending = self.prepare_records(corpus, options, &mut report);
        info!(
            "Prepared {} of {} records ({} invalid, {} duplicate, {} truncated)",
            pending.len(),
            corpus.len(),
            report.skipped_invalid,
            report.skipped_duplicate,
            report.truncated
        );

        let mut records = Vec::with_capacity(pending.len());
        for (batch_index, batch) in pending.chunks(options.batch_size).enumerate() {
            match self.embed_batch(batch).await? {
                Some(embeddings) => {
                    for (item, embeddings) in batch.iter().zip(embeddings) {
                        records.push(
                            QaRecord {
                                metadata: item.metadata.clone(),
                                ..QaRecord::new(&item.id, &item.question, &item.answer)
                            }
                            .with_embeddings(embeddings)
                        );
                    }
                    debug!("Embedded batch {} ({} records)", batch_index, batch.len());
                }
                None => {
                    report.embedding_batches_failed += 1;
                    report.skipped_embedding += batch.len();
                    self.telemetry.record_batch_skipped("embedding");
                }
            }
        }

        self.link(&mut records, options, &mut report)?;
        self.write(&records, options, &mut report).await?;
        self.store.flush().await?;

        report.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.telemetry.record_build(&report);
        info!(
            "Build finished: {} written, {} edges, {} skipped in {}ms",
            report.written,
            report.edges,
            report.total_skipped(),
            report.duration_ms
        );
        Ok(report)
    }

    async fn prepare_collection(
        &self,
        options: &BuildOptions,
        report: &mut BuildReport
    ) -> Result<(), BuildError> {
        let health = self.store.health_check().await?;
        if !health.healthy {
            return Err(StoreError::Unavailable {
                backend: health.backend,
                reason: health.message.unwrap_or_else(|| "health check failed".to_string())
            }
            .into());
        }

        if options.drop_existing {
            info!("Dropping existing collection before rebuild");
            self.store.drop_collection().await?;
        }

        report.collection_created = self.store.ensure_collection().await?;
        let indexes = self.store.ensure_indexes(&VectorField::ALL).await?;
        if !indexes.existing.is_empty() {
            debug!("Indexes already present: {:?}", indexes.existing);
        }
        if !indexes.created.is_empty() {
            info!("Created indexes: {:?}", indexes.created);
        }
        Ok(())
    }

    fn prepare_records(
        &self,
        corpus: &[CorpusEntry],
        options: &BuildOptions,
        report: &mut BuildReport
    ) -> Vec<PendingRecord> {
        let mut seen = HashSet::new();
        let mut pending = Vec::with_capacity(corpus.len());

        for (index, entry) in corpus.iter().enumerate() {
            if !entry.is_valid() {
                report.skipped_invalid += 1;
                continue;
            }

            let id = entry.id.clone().unwrap_or_else(|| format!("qa_{index}"));
            if !seen.insert(id.clone()) {
                warn!("Duplicate record id {}, keeping the first occurrence", id);
                report.skipped_duplicate += 1;
                continue;
            }

            let (question, q_cut) = truncate_chars(&entry.question, options.max_question_chars);
            let (answer, a_cut) = truncate_chars(&entry.answer, options.max_answer_chars);
            if q_cut || a_cut {
                report.truncated += 1;
            }

            pending.push(PendingRecord {
                id,
                question,
                answer,
                metadata: entry.metadata.clone()
            });
        }
        pending
    }

    /// Embeds one batch. `Ok(None)` means the batch failed and is skipped.
    async fn embed_batch(
        &self,
        batch: &[PendingRecord]
    ) -> Result<Option<Vec<NodeEmbeddings>>, BuildError> {
        let questions: Vec<String> = batch.iter().map(|r| r.question.clone()).collect();
        let answers: Vec<String> = batch.iter().map(|r| r.answer.clone()).collect();
        let combined: Vec<String> = batch
            .iter()
            .map(|r| combined_text(&r.question, &r.answer))
            .collect();

        let mut vectors = Vec::with_capacity(3);
        for texts in [&questions, &answers, &combined] {
            match self.embedder.embed_batch(texts).await {
                Ok(v) if v.len() == texts.len() => vectors.push(v),
                Ok(v) => {
                    warn!(
                        "Embedding batch returned {} vectors for {} texts, skipping batch",
                        v.len(),
                        texts.len()
                    );
                    return Ok(None);
                }
                Err(ProviderError::DimensionMismatch { actual, .. }) => {
                    return Err(ConfigurationError::DimensionMismatch {
                        embedding: actual,
                        store: self.store.dimension()
                    }
                    .into());
                }
                Err(e) => {
                    warn!("Embedding batch failed, skipping {} records: {}", batch.len(), e);
                    return Ok(None);
                }
            }
        }

        let dimension = self.store.dimension();
        if let Some(bad) = vectors.iter().flatten().find(|v| v.len() != dimension) {
            return Err(ConfigurationError::DimensionMismatch {
                embedding: bad.len(),
                store: dimension
            }
            .into());
        }

        let mut columns = vectors.into_iter();
        let (Some(q), Some(a), Some(c)) = (columns.next(), columns.next(), columns.next()) else {
            return Ok(None);
        };

        Ok(Some(
            q.into_iter()
                .zip(a)
                .zip(c)
                .map(|((question, answer), combined)| NodeEmbeddings {
                    question,
                    answer,
                    combined
                })
                .collect()
        ))
    }

    fn link(
        &self,
        records: &mut [QaRecord],
        options: &BuildOptions,
        report: &mut BuildReport
    ) -> Result<(), BuildError> {
        let combined: Vec<Vec<f32>> = records
            .iter()
            .map(|r| {
                r.embeddings
                    .as_ref()
                    .map(|e| e.combined.clone())
                    .unwrap_or_default()
            })
            .collect();

        let graph = build_similarity_graph(
            &combined,
            &SimilarityParams {
                threshold: options.similarity_threshold,
                fan_out_cap: options.fan_out_cap,
                tile_size: options.tile_size,
                adjacency: options.adjacency
            }
        )?;

        let ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
        for (record, neighbors) in records.iter_mut().zip(&graph.neighbors) {
            record.related_nodes = neighbors.iter().map(|n| ids[n.index].clone()).collect();
        }

        report.edges = graph.edge_count();
        report.nodes_with_edges = graph.nodes_with_edges();
        report.max_fan_out = graph.max_fan_out();
        info!(
            "Similarity graph: {} adjacency entries over {} nodes (threshold {})",
            report.edges,
            records.len(),
            options.similarity_threshold
        );
        Ok(())
    }

    async fn write(
        &self,
        records: &[QaRecord],
        options: &BuildOptions,
        report: &mut BuildReport
    ) -> Result<(), BuildError> {
        for batch in records.chunks(options.write_batch_size) {
            match self.store.upsert_nodes(batch).await {
                Ok(written) => report.written += written,
                Err(StoreError::Configuration(e)) => return Err(e.into()),
                Err(e) => {
                    warn!("Write batch of {} records failed: {}", batch.len(), e);
                    report.failed_writes += batch.len();
                    self.telemetry.record_store_failure("upsert");
                    self.telemetry.record_batch_skipped("write");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::MockEmbeddingService;
    use storage::InMemoryGraphStore;

    fn options() -> BuildOptions {
        BuildOptions {
            similarity_threshold: 0.7,
            batch_size: 2,
            ..BuildOptions::default()
        }
    }

    #[test]
    fn test_truncate_chars_is_char_safe() {
        assert_eq!(truncate_chars("héllo", 2), ("hé".to_string(), true));
        assert_eq!(truncate_chars("abc", 3), ("abc".to_string(), false));
    }

    #[test]
    fn test_dimension_mismatch_is_fatal_at_construction() {
        let store = Arc::new(InMemoryGraphStore::new(4));
        let embedder = Arc::new(MockEmbeddingService::new(8));
        let result = GraphBuilder::new(store, embedder);
        assert!(matches!(
            result,
            Err(BuildError::Configuration(ConfigurationError::DimensionMismatch {
                embedding: 8,
                store: 4
            }))
        ));
    }

    #[tokio::test]
    async fn test_build_skips_invalid_duplicates_and_failed_batches() {
        let store = Arc::new(InMemoryGraphStore::new(16));
        let embedder = Arc::new(MockEmbeddingService::new(16).fail_when_contains("POISON"));
        let builder = GraphBuilder::new(store.clone(), embedder.clone()).unwrap();

        let corpus = vec![
            CorpusEntry::new("What causes fever?", "Fever is often an infection.").with_id("a"),
            CorpusEntry::new("Fever in children?", "Fever with infection is common.").with_id("b"),
            CorpusEntry::new("", "no question").with_id("c"),
            CorpusEntry::new("Duplicate?", "Same id as a.").with_id("a"),
            CorpusEntry::new("POISON question", "fails to embed").with_id("d"),
            CorpusEntry::new("Heart pain?", "See a doctor.").with_id("e")
        ];

        let report = builder.build(&corpus, &options()).await.unwrap();

        assert_eq!(report.total_input, 6);
        assert_eq!(report.skipped_invalid, 1);
        assert_eq!(report.skipped_duplicate, 1);
        assert_eq!(report.embedding_batches_failed, 1);
        assert_eq!(report.skipped_embedding, 2);
        assert_eq!(report.written, 2);
        assert!(report.collection_created);
        assert_eq!(embedder.batch_calls(), 3 + 1);

        let a = store.get_by_id("a").await.unwrap().unwrap();
        assert_eq!(a.related_nodes, vec!["b".to_string()]);
        assert!(store.get_by_id("d").await.unwrap().is_none());
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_store_is_fatal() {
        let store = Arc::new(InMemoryGraphStore::new(16));
        store.set_unavailable(true);
        let builder = GraphBuilder::new(store, Arc::new(MockEmbeddingService::new(16))).unwrap();

        let err = builder
            .build(&[CorpusEntry::new("q", "a")], &options())
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::Store(StoreError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn test_wrong_vector_length_mid_run_is_fatal() {
        let store = Arc::new(InMemoryGraphStore::new(3));
        let embedder = Arc::new(MockEmbeddingService::new(3).with_vector("odd", vec![1.0, 0.0]));
        let builder = GraphBuilder::new(store, embedder).unwrap();

        let err = builder
            .build(&[CorpusEntry::new("odd", "answer")], &options())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::Configuration(ConfigurationError::DimensionMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_rebuild_is_idempotent_and_drop_existing_recreates() {
        let store = Arc::new(InMemoryGraphStore::new(16));
        let builder =
            GraphBuilder::new(store.clone(), Arc::new(MockEmbeddingService::new(16))).unwrap();
        let corpus = vec![
            CorpusEntry::new("Fever?", "Infection."),
            CorpusEntry::new("Cough?", "Cold.")
        ];

        let first = builder.build(&corpus, &options()).await.unwrap();
        assert!(first.collection_created);
        let second = builder.build(&corpus, &options()).await.unwrap();
        assert!(!second.collection_created);
        assert_eq!(store.count().await.unwrap(), 2);

        let dropped = builder
            .build(
                &corpus[..1],
                &BuildOptions {
                    drop_existing: true,
                    ..options()
                }
            )
            .await
            .unwrap();
        assert!(dropped.collection_created);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_truncation_is_counted() {
        let store = Arc::new(InMemoryGraphStore::new(16));
        let builder =
            GraphBuilder::new(store.clone(), Arc::new(MockEmbeddingService::new(16))).unwrap();
        let corpus = vec![CorpusEntry::new("a long question", "short").with_id("t")];

        let report = builder
            .build(
                &corpus,
                &BuildOptions {
                    max_question_chars: 6,
                    ..options()
                }
            )
            .await
            .unwrap();

        assert_eq!(report.truncated, 1);
        let stored = store.get_by_id("t").await.unwrap().unwrap();
        assert_eq!(stored.question, "a long");
    }

    #[tokio::test]
    async fn test_invalid_options_rejected() {
        let store = Arc::new(InMemoryGraphStore::new(16));
        let builder = GraphBuilder::new(store, Arc::new(MockEmbeddingService::new(16))).unwrap();
        let err = builder
            .build(
                &[],
                &BuildOptions {
                    similarity_threshold: 1.5,
                    ..options()
                }
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::Configuration(_)));
    }
}
