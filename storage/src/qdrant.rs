//! Qdrant adapter for the graph store.
//!
//! One point per record. The three embeddings are stored as named vectors
//! (cosine distance); text, metadata and the adjacency list live in the
//! payload. Qdrant point ids must be UUIDs or integers, so the record id is
//! mapped to a UUID v5 and kept verbatim in the `qa_id` payload field.

use async_trait::async_trait;
use config::StoreConfig;
use errors::{ConfigurationError, StoreError};
use qdrant_client::{
    Payload, Qdrant,
    qdrant::{
        CountPointsBuilder, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder,
        DeleteCollectionBuilder, Distance, FieldType, GetPointsBuilder, NamedVectors, PointId,
        PointStruct, SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue,
        VectorParams, VectorParamsMap, VectorsConfig, vectors_config::Config
    }
};
use rag_core::{GraphStore, HealthStatus, IndexReport, QaRecord, ScoredRecord, VectorField};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Payload field holding the original record id.
pub const ID_FIELD: &str = "qa_id";

#[derive(Debug, Serialize, Deserialize)]
struct StoredPayload {
    qa_id: String,
    question: String,
    answer: String,
    #[serde(default)]
    metadata: HashMap<String, serde_json::Value>,
    #[serde(default)]
    related_nodes: Vec<String>
}

pub struct QdrantGraphStore {
    client: Arc<Qdrant>,
    collection: String,
    dimension: usize,
    timeout: Duration
}

impl QdrantGraphStore {
    pub fn new(config: &StoreConfig, dimension: usize) -> Result<Self, StoreError> {
        let mut builder = Qdrant::from_url(&config.url);

        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
        }

        let client = builder.build().map_err(|e| StoreError::Unavailable {
            backend: "qdrant".to_string(),
            reason: format!("{}: {}", config.url, e)
        })?;

        Ok(Self {
            client: Arc::new(client),
            collection: config.collection.clone(),
            dimension,
            timeout: Duration::from_millis(config.timeout_ms)
        })
    }

    /// Builds the client and verifies the server answers.
    ///
    /// An unreachable server is reported as [`StoreError::Unavailable`], which
    /// callers treat as fatal at startup.
    pub async fn connect(config: &StoreConfig, dimension: usize) -> Result<Self, StoreError> {
        let store = Self::new(config, dimension)?;
        let health = store.health_check().await?;
        if !health.healthy {
            return Err(StoreError::Unavailable {
                backend: "qdrant".to_string(),
                reason: health.message.unwrap_or_else(|| config.url.clone())
            });
        }
        Ok(store)
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Deterministic point id for a record id.
    pub fn point_id(id: &str) -> PointId {
        PointId::from(Uuid::new_v5(&Uuid::NAMESPACE_OID, id.as_bytes()).to_string())
    }

    async fn call<T, E, F>(&self, operation: &str, fut: F) -> Result<T, StoreError>
    where
        E: std::fmt::Display,
        F: Future<Output = Result<T, E>>
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(StoreError::operation(operation, e)),
            Err(_) => Err(StoreError::Timeout {
                operation: operation.to_string(),
                timeout_ms: self.timeout.as_millis() as u64
            })
        }
    }

    fn vector_params(&self) -> VectorParams {
        VectorParams {
            size: self.dimension as u64,
            distance: Distance::Cosine.into(),
            ..Default::default()
        }
    }

    fn record_to_point(&self, record: &QaRecord) -> Result<PointStruct, StoreError> {
        let embeddings = record.embeddings.as_ref().ok_or_else(|| {
            StoreError::operation("upsert", format!("record {} has no embeddings", record.id))
        })?;
        if !embeddings.has_dimension(self.dimension) {
            return Err(ConfigurationError::DimensionMismatch {
                embedding: embeddings.combined.len(),
                store: self.dimension
            }
            .into());
        }

        let mut vectors = NamedVectors::default();
        for field in VectorField::ALL {
            vectors = vectors.add_vector(field.as_str(), embeddings.get(field).to_vec());
        }

        let stored = StoredPayload {
            qa_id: record.id.clone(),
            question: record.question.clone(),
            answer: record.answer.clone(),
            metadata: record.metadata.clone(),
            related_nodes: record.related_nodes.clone()
        };
        let json = serde_json::to_value(&stored).map_err(|e| StoreError::Decode {
            id: record.id.clone(),
            reason: e.to_string()
        })?;
        let payload = Payload::try_from(json).map_err(|e| StoreError::Decode {
            id: record.id.clone(),
            reason: e.to_string()
        })?;

        Ok(PointStruct::new(Self::point_id(&record.id), vectors, payload))
    }

    fn payload_to_record(payload: HashMap<String, QdrantValue>) -> Result<QaRecord, StoreError> {
        let map: serde_json::Map<String, serde_json::Value> = payload
            .into_iter()
            .map(|(key, value)| (key, serde_json::Value::from(value)))
            .collect();
        let id = map
            .get(ID_FIELD)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        let stored: StoredPayload =
            serde_json::from_value(serde_json::Value::Object(map)).map_err(|e| {
                StoreError::Decode {
                    id,
                    reason: e.to_string()
                }
            })?;

        Ok(QaRecord {
            id: stored.qa_id,
            question: stored.question,
            answer: stored.answer,
            embeddings: None,
            metadata: stored.metadata,
            related_nodes: stored.related_nodes
        })
    }

    /// Dimension of the named combined vector of an existing collection.
    pub async fn collection_dimension(&self) -> Result<Option<u64>, StoreError> {
        let info = self
            .call("collection_info", self.client.collection_info(self.collection.as_str()))
            .await?;
        Ok(named_vector_params(info.result)
            .and_then(|map| map.get(VectorField::Combined.as_str()).map(|p| p.size)))
    }
}

fn named_vector_params(
    info: Option<qdrant_client::qdrant::CollectionInfo>
) -> Option<HashMap<String, VectorParams>> {
    let config = info?.config?.params?.vectors_config?.config?;
    match config {
        Config::ParamsMap(map) => Some(map.map),
        Config::Params(_) => None
    }
}

#[async_trait]
impl GraphStore for QdrantGraphStore {
    fn backend_name(&self) -> &'static str {
        "qdrant"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn health_check(&self) -> Result<HealthStatus, StoreError> {
        let start = Instant::now();

        match tokio::time::timeout(self.timeout, self.client.health_check()).await {
            Ok(Ok(_)) => {
                let latency = start.elapsed().as_millis() as u64;
                Ok(HealthStatus::healthy("qdrant").with_latency(latency))
            }
            Ok(Err(e)) => Ok(HealthStatus::unhealthy("qdrant", e.to_string())),
            Err(_) => Ok(HealthStatus::unhealthy("qdrant", "health check timed out"))
        }
    }

    #[instrument(skip(self), fields(collection = %self.collection))]
    async fn ensure_collection(&self) -> Result<bool, StoreError> {
        let exists = self
            .call(
                "collection_exists",
                self.client.collection_exists(self.collection.as_str())
            )
            .await?;
        if exists {
            return Ok(false);
        }

        let map = VectorField::ALL
            .iter()
            .map(|field| (field.as_str().to_string(), self.vector_params()))
            .collect();
        let request = CreateCollectionBuilder::new(&self.collection).vectors_config(VectorsConfig {
            config: Some(Config::ParamsMap(VectorParamsMap { map }))
        });

        self.call("create_collection", self.client.create_collection(request))
            .await?;
        info!(dimension = self.dimension, "Created collection");
        Ok(true)
    }

    #[instrument(skip(self, fields), fields(collection = %self.collection))]
    async fn ensure_indexes(&self, fields: &[VectorField]) -> Result<IndexReport, StoreError> {
        let info = self
            .call("collection_info", self.client.collection_info(self.collection.as_str()))
            .await?
            .result;
        let Some(info) = info else {
            return Err(StoreError::CollectionMissing {
                collection: self.collection.clone()
            });
        };
        let has_id_index = info.payload_schema.contains_key(ID_FIELD);

        let params = named_vector_params(Some(info)).ok_or_else(|| {
            ConfigurationError::SchemaMismatch {
                collection: self.collection.clone(),
                reason: "collection has no named vectors; recreate it with --drop-existing"
                    .to_string()
            }
        })?;

        let mut report = IndexReport::default();
        for field in fields {
            match params.get(field.as_str()) {
                Some(p) if p.size as usize == self.dimension => {
                    report.existing.push(field.as_str().to_string());
                }
                Some(p) => {
                    return Err(ConfigurationError::DimensionMismatch {
                        embedding: self.dimension,
                        store: p.size as usize
                    }
                    .into());
                }
                None => {
                    return Err(ConfigurationError::SchemaMismatch {
                        collection: self.collection.clone(),
                        reason: format!("missing vector field {}", field.as_str())
                    }
                    .into());
                }
            }
        }

        if has_id_index {
            report.existing.push(ID_FIELD.to_string());
        } else {
            let request =
                CreateFieldIndexCollectionBuilder::new(&self.collection, ID_FIELD, FieldType::Keyword)
                    .wait(true);
            self.call("create_field_index", self.client.create_field_index(request))
                .await?;
            report.created.push(ID_FIELD.to_string());
        }

        debug!(created = ?report.created, existing = ?report.existing, "Indexes ensured");
        Ok(report)
    }

    async fn drop_collection(&self) -> Result<(), StoreError> {
        let exists = self
            .call(
                "collection_exists",
                self.client.collection_exists(self.collection.as_str())
            )
            .await?;
        if exists {
            self.call(
                "delete_collection",
                self.client
                    .delete_collection(DeleteCollectionBuilder::new(&self.collection))
            )
            .await?;
            info!(collection = %self.collection, "Dropped collection");
        }
        Ok(())
    }

    async fn upsert_nodes(&self, records: &[QaRecord]) -> Result<usize, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }
        let points = records
            .iter()
            .map(|r| self.record_to_point(r))
            .collect::<Result<Vec<_>, _>>()?;
        let count = points.len();

        let request = UpsertPointsBuilder::new(&self.collection, points).wait(true);
        self.call("upsert", self.client.upsert_points(request))
            .await?;
        Ok(count)
    }

    async fn search(
        &self,
        field: VectorField,
        query: &[f32],
        top_k: usize
    ) -> Result<Vec<ScoredRecord>, StoreError> {
        if query.len() != self.dimension {
            return Err(ConfigurationError::DimensionMismatch {
                embedding: query.len(),
                store: self.dimension
            }
            .into());
        }

        let request = SearchPointsBuilder::new(&self.collection, query.to_vec(), top_k as u64)
            .vector_name(field.as_str())
            .with_payload(true);

        let response = self
            .call("search", self.client.search_points(request))
            .await?;

        response
            .result
            .into_iter()
            .map(|point| {
                Ok(ScoredRecord {
                    record: Self::payload_to_record(point.payload)?,
                    similarity: point.score
                })
            })
            .collect()
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<QaRecord>, StoreError> {
        Ok(self.get_many(&[id.to_string()]).await?.into_iter().next())
    }

    async fn get_many(&self, ids: &[String]) -> Result<Vec<QaRecord>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let point_ids: Vec<PointId> = ids.iter().map(|id| Self::point_id(id)).collect();
        let request = GetPointsBuilder::new(&self.collection, point_ids)
            .with_payload(true)
            .with_vectors(false);

        let response = self
            .call("get_points", self.client.get_points(request))
            .await?;

        let mut by_id: HashMap<String, QaRecord> = HashMap::with_capacity(response.result.len());
        for point in response.result {
            let record = Self::payload_to_record(point.payload)?;
            by_id.insert(record.id.clone(), record);
        }

        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let response = self
            .call(
                "count",
                self.client
                    .count(CountPointsBuilder::new(&self.collection).exact(true))
            )
            .await?;
        Ok(response.result.map_or(0, |r| r.count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rag_core::NodeEmbeddings;

    fn store(dimension: usize) -> QdrantGraphStore {
        QdrantGraphStore::new(&StoreConfig::default(), dimension).unwrap()
    }

    #[test]
    fn test_point_id_is_deterministic_uuid() {
        let a = QdrantGraphStore::point_id("qa_1");
        let b = QdrantGraphStore::point_id("qa_1");
        let c = QdrantGraphStore::point_id("qa_2");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_record_to_point_uses_named_vectors_and_payload() {
        let record = QaRecord::new("qa_7", "What causes fever?", "Usually infection.")
            .with_embeddings(NodeEmbeddings {
                question: vec![0.1, 0.2, 0.3],
                answer: vec![0.3, 0.2, 0.1],
                combined: vec![0.2, 0.2, 0.2]
            })
            .with_metadata("source", serde_json::json!("medqa"))
            .with_related_nodes(vec!["qa_8".to_string()]);

        let point = store(3).record_to_point(&record).unwrap();
        assert!(point.id.is_some());
        assert!(point.vectors.is_some());
        assert!(point.payload.contains_key(ID_FIELD));
        assert!(point.payload.contains_key("related_nodes"));
        assert!(point.payload.contains_key("metadata"));
    }

    #[test]
    fn test_record_to_point_rejects_wrong_dimension() {
        let record = QaRecord::new("qa_1", "q", "a").with_embeddings(NodeEmbeddings {
            question: vec![0.1; 4],
            answer: vec![0.1; 4],
            combined: vec![0.1; 4]
        });
        let err = store(3).record_to_point(&record).unwrap_err();
        assert!(err.is_fatal());

        let bare = QaRecord::new("qa_2", "q", "a");
        assert!(store(3).record_to_point(&bare).is_err());
    }

    #[test]
    fn test_payload_round_trip() {
        let record = QaRecord::new("qa_3", "Is cough contagious?", "Depends on the cause.")
            .with_embeddings(NodeEmbeddings {
                question: vec![1.0, 0.0],
                answer: vec![0.0, 1.0],
                combined: vec![0.7, 0.7]
            })
            .with_related_nodes(vec!["qa_4".to_string(), "qa_9".to_string()]);

        let point = store(2).record_to_point(&record).unwrap();
        let decoded = QdrantGraphStore::payload_to_record(point.payload).unwrap();

        assert_eq!(decoded.id, record.id);
        assert_eq!(decoded.question, record.question);
        assert_eq!(decoded.answer, record.answer);
        assert_eq!(decoded.related_nodes, record.related_nodes);
        assert!(decoded.embeddings.is_none());
    }
}
