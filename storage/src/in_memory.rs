//! Process-local graph store with brute-force cosine search.
//!
//! Used by tests and for small offline experiments. Supports fault injection
//! so callers can exercise their degradation paths.

use async_trait::async_trait;
use errors::{ConfigurationError, StoreError};
use parking_lot::RwLock;
use rag_core::{
    GraphStore, HealthStatus, IndexReport, QaRecord, ScoredRecord, VectorField, cosine_similarity
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
struct CollectionState {
    records: HashMap<String, QaRecord>,
    /// Insertion order, used to break search ties deterministically.
    order: Vec<String>,
    indexed: HashSet<VectorField>
}

pub struct InMemoryGraphStore {
    dimension: usize,
    state: RwLock<Option<CollectionState>>,
    unavailable: AtomicBool,
    read_delay_ms: AtomicUsize,
    search_calls: AtomicUsize,
    get_calls: AtomicUsize
}

impl InMemoryGraphStore {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            state: RwLock::new(None),
            unavailable: AtomicBool::new(false),
            read_delay_ms: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0)
        }
    }

    /// Creates a store whose collection and indexes already exist.
    pub fn ready(dimension: usize) -> Self {
        let store = Self::new(dimension);
        *store.state.write() = Some(CollectionState {
            indexed: VectorField::ALL.into_iter().collect(),
            ..CollectionState::default()
        });
        store
    }

    /// Makes every subsequent call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Delays every read, to exercise caller timeouts.
    pub fn set_read_delay(&self, delay: Duration) {
        self.read_delay_ms
            .store(delay.as_millis() as usize, Ordering::SeqCst);
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    /// Number of `get_by_id`/`get_many` calls served.
    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                backend: self.backend_name().to_string(),
                reason: "store marked unavailable".to_string()
            });
        }
        Ok(())
    }

    async fn read_delay(&self) {
        let delay = self.read_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
        }
    }

    fn check_dimension(&self, actual: usize) -> Result<(), StoreError> {
        if actual != self.dimension {
            return Err(ConfigurationError::DimensionMismatch {
                embedding: actual,
                store: self.dimension
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    fn backend_name(&self) -> &'static str {
        "in_memory"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn health_check(&self) -> Result<HealthStatus, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Ok(HealthStatus::unhealthy(self.backend_name(), "marked unavailable"));
        }
        Ok(HealthStatus::healthy(self.backend_name()).with_latency(0))
    }

    async fn ensure_collection(&self) -> Result<bool, StoreError> {
        self.check_available()?;
        let mut state = self.state.write();
        if state.is_some() {
            return Ok(false);
        }
        *state = Some(CollectionState::default());
        Ok(true)
    }

    async fn ensure_indexes(&self, fields: &[VectorField]) -> Result<IndexReport, StoreError> {
        self.check_available()?;
        let mut guard = self.state.write();
        let state = guard.as_mut().ok_or_else(|| StoreError::CollectionMissing {
            collection: "in_memory".to_string()
        })?;

        let mut report = IndexReport::default();
        for field in fields {
            if state.indexed.insert(*field) {
                report.created.push(field.as_str().to_string());
            } else {
                report.existing.push(field.as_str().to_string());
            }
        }
        Ok(report)
    }

    async fn drop_collection(&self) -> Result<(), StoreError> {
        self.check_available()?;
        *self.state.write() = None;
        Ok(())
    }

    async fn upsert_nodes(&self, records: &[QaRecord]) -> Result<usize, StoreError> {
        self.check_available()?;
        for record in records {
            let embeddings = record.embeddings.as_ref().ok_or_else(|| {
                StoreError::operation("upsert", format!("record {} has no embeddings", record.id))
            })?;
            if !embeddings.has_dimension(self.dimension) {
                self.check_dimension(embeddings.combined.len())?;
                self.check_dimension(embeddings.question.len())?;
                self.check_dimension(embeddings.answer.len())?;
            }
        }

        let mut guard = self.state.write();
        let state = guard.as_mut().ok_or_else(|| StoreError::CollectionMissing {
            collection: "in_memory".to_string()
        })?;

        for record in records {
            if state
                .records
                .insert(record.id.clone(), record.clone())
                .is_none()
            {
                state.order.push(record.id.clone());
            }
        }
        Ok(records.len())
    }

    async fn search(
        &self,
        field: VectorField,
        query: &[f32],
        top_k: usize
    ) -> Result<Vec<ScoredRecord>, StoreError> {
        self.check_available()?;
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.read_delay().await;
        self.check_dimension(query.len())?;

        let guard = self.state.read();
        let state = guard.as_ref().ok_or_else(|| StoreError::CollectionMissing {
            collection: "in_memory".to_string()
        })?;
        if !state.indexed.contains(&field) {
            return Err(StoreError::operation(
                "search",
                format!("no index on {}", field.as_str())
            ));
        }

        let mut scored: Vec<(usize, f32)> = state
            .order
            .iter()
            .enumerate()
            .filter_map(|(position, id)| {
                let embeddings = state.records.get(id)?.embeddings.as_ref()?;
                Some((position, cosine_similarity(query, embeddings.get(field))))
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        Ok(scored
            .into_iter()
            .take(top_k)
            .filter_map(|(position, similarity)| {
                let record = state.records.get(&state.order[position])?.clone();
                Some(ScoredRecord { record, similarity })
            })
            .collect())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<QaRecord>, StoreError> {
        self.check_available()?;
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.read_delay().await;

        let guard = self.state.read();
        Ok(guard.as_ref().and_then(|state| state.records.get(id).cloned()))
    }

    async fn get_many(&self, ids: &[String]) -> Result<Vec<QaRecord>, StoreError> {
        self.check_available()?;
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.read_delay().await;

        let guard = self.state.read();
        let Some(state) = guard.as_ref() else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .filter_map(|id| state.records.get(id).cloned())
            .collect())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.check_available()?;
        Ok(self
            .state
            .read()
            .as_ref()
            .map_or(0, |state| state.records.len() as u64))
    }
}
