//! Capability traits consumed by the builder, retriever and planner.

use async_trait::async_trait;
use errors::{ProviderError, StoreError};

use crate::types::{HealthStatus, IndexReport, QaRecord, ScoredRecord, VectorField};

/// Maps text to a fixed-dimension dense vector. Deterministic for a fixed model.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;

    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }
}

/// Text generation capability: `generate(prompt) -> text`.
#[async_trait]
pub trait LlmService: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Provider name used in logs and metrics.
    fn name(&self) -> &str;
}

/// Persistence for graph nodes with three vector fields and an adjacency list.
///
/// Adapters must support concurrent reads. Writes only happen from the
/// offline builder, which is the single writer of a collection.
#[async_trait]
pub trait GraphStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Vector dimension the collection is bound to.
    fn dimension(&self) -> usize;

    async fn health_check(&self) -> Result<HealthStatus, StoreError>;

    /// Creates the collection if it does not exist.
    ///
    /// # Returns
    ///
    /// `true` when the collection was created by this call.
    async fn ensure_collection(&self) -> Result<bool, StoreError>;

    /// Makes sure the search structures for `fields` exist. Idempotent: indexes
    /// that already exist are reported and left untouched.
    async fn ensure_indexes(&self, fields: &[VectorField]) -> Result<IndexReport, StoreError>;

    async fn drop_collection(&self) -> Result<(), StoreError>;

    /// Inserts or replaces records by id.
    ///
    /// # Returns
    ///
    /// Number of records written.
    async fn upsert_nodes(&self, records: &[QaRecord]) -> Result<usize, StoreError>;

    async fn upsert_node(&self, record: &QaRecord) -> Result<(), StoreError> {
        self.upsert_nodes(std::slice::from_ref(record)).await?;
        Ok(())
    }

    /// Nearest-neighbour search on one vector field, best match first.
    async fn search(
        &self,
        field: VectorField,
        query: &[f32],
        top_k: usize
    ) -> Result<Vec<ScoredRecord>, StoreError>;

    async fn get_by_id(&self, id: &str) -> Result<Option<QaRecord>, StoreError>;

    /// Fetches several records in one call. Missing ids are left out; the
    /// order of the returned records follows `ids`.
    async fn get_many(&self, ids: &[String]) -> Result<Vec<QaRecord>, StoreError> {
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.get_by_id(id).await? {
                records.push(record);
            }
        }
        Ok(records)
    }

    async fn count(&self) -> Result<u64, StoreError>;

    /// Makes all previous writes visible to readers.
    async fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
