use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::{Display, EnumString};

/// One of the three vector fields every [`QaRecord`] carries.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VectorField {
    #[strum(to_string = "question_embedding")]
    #[serde(rename = "question_embedding")]
    Question,
    #[strum(to_string = "answer_embedding")]
    #[serde(rename = "answer_embedding")]
    Answer,
    #[strum(to_string = "combined_embedding")]
    #[serde(rename = "combined_embedding")]
    Combined
}

impl VectorField {
    pub const ALL: [VectorField; 3] = [Self::Question, Self::Answer, Self::Combined];

    /// Field name as persisted by store adapters.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Question => "question_embedding",
            Self::Answer => "answer_embedding",
            Self::Combined => "combined_embedding"
        }
    }
}

/// The three embeddings of one record. All share the store dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeEmbeddings {
    pub question: Vec<f32>,
    pub answer: Vec<f32>,
    pub combined: Vec<f32>
}

impl NodeEmbeddings {
    pub fn get(&self, field: VectorField) -> &[f32] {
        match field {
            VectorField::Question => &self.question,
            VectorField::Answer => &self.answer,
            VectorField::Combined => &self.combined
        }
    }

    /// Returns true when all three vectors have exactly `dimension` entries.
    pub fn has_dimension(&self, dimension: usize) -> bool {
        self.question.len() == dimension
            && self.answer.len() == dimension
            && self.combined.len() == dimension
    }
}

/// Graph node: one question/answer pair plus its adjacency list.
///
/// `related_nodes` is ordered by descending similarity at write time and
/// never exceeds the fan-out cap the graph was built with.
///
/// `embeddings` is always present on records produced by the builder. Store
/// adapters may omit it on reads since retrieval never needs the vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaRecord {
    pub id: String,
    pub question: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embeddings: Option<NodeEmbeddings>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub related_nodes: Vec<String>
}

impl QaRecord {
    pub fn new(id: impl Into<String>, question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            answer: answer.into(),
            embeddings: None,
            metadata: HashMap::new(),
            related_nodes: Vec::new()
        }
    }

    pub fn with_embeddings(mut self, embeddings: NodeEmbeddings) -> Self {
        self.embeddings = Some(embeddings);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn with_related_nodes(mut self, related: Vec<String>) -> Self {
        self.related_nodes = related;
        self
    }
}

/// Directed similarity edge. Lives only during construction and as provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityEdge {
    pub source_id: String,
    pub target_id: String,
    pub similarity: f32
}

/// A search hit: the record and its cosine similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub record: QaRecord,
    pub similarity: f32
}

/// How a node entered a retrieval result.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeOrigin {
    Seed,
    Traversal
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedNode {
    pub record: QaRecord,
    /// Search similarity for seeds, 0.0 for nodes reached by traversal.
    pub similarity: f32,
    pub origin: NodeOrigin,
    /// BFS level the node was discovered at; seeds are level 0.
    pub depth: usize
}

impl RetrievedNode {
    pub fn seed(record: QaRecord, similarity: f32) -> Self {
        Self {
            record,
            similarity,
            origin: NodeOrigin::Seed,
            depth: 0
        }
    }

    pub fn traversal(record: QaRecord, depth: usize) -> Self {
        Self {
            record,
            similarity: 0.0,
            origin: NodeOrigin::Traversal,
            depth
        }
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraversedEdge {
    pub source_id: String,
    pub target_id: String
}

/// Per-query retrieval bundle. Seeds come first in search-rank order,
/// followed by expansion nodes in discovery order.
///
/// An empty result is just empty: no nodes, no edges, empty context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub nodes: Vec<RetrievedNode>,
    pub edges: Vec<TraversedEdge>,
    pub context: String,
    pub depth_reached: usize
}

impl RetrievalResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_ids(&self) -> Vec<&str> {
        self.nodes.iter().map(RetrievedNode::id).collect()
    }

    pub fn seed_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.origin == NodeOrigin::Seed)
            .count()
    }
}

/// Query categories, in ascending classification precedence.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskType {
    SimpleRetrieval,
    GraphRag,
    MultiStepReasoning,
    ComparativeAnalysis
}

/// Closed step vocabulary of the iterative executor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StepAction {
    VectorRetrieval,
    EntityExtraction,
    GraphTraversal,
    InitialRetrieval,
    Reasoning,
    RefinedRetrieval,
    ExtractComparisonEntities,
    ParallelRetrieval,
    ContextIntegration,
    ComparativeIntegration,
    GenerateResponse
}

impl StepAction {
    /// Whether executing this step reads from the graph store.
    pub fn retrieves(&self) -> bool {
        matches!(
            self,
            Self::VectorRetrieval
                | Self::InitialRetrieval
                | Self::ParallelRetrieval
                | Self::GraphTraversal
                | Self::RefinedRetrieval
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub index: usize,
    pub action: StepAction,
    pub description: String
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPlan {
    pub task_type: TaskType,
    pub steps: Vec<PlanStep>,
    pub reasoning_required: bool,
    pub expected_iterations: usize
}

impl TaskPlan {
    /// Step for a loop iteration. Iterations past the end repeat the last step.
    pub fn step_for_iteration(&self, iteration: usize) -> Option<&PlanStep> {
        let last = self.steps.len().checked_sub(1)?;
        self.steps.get(iteration.min(last))
    }
}

/// Summary of one offline build run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildReport {
    pub total_input: usize,
    pub written: usize,
    pub skipped_invalid: usize,
    pub skipped_duplicate: usize,
    pub skipped_embedding: usize,
    pub failed_writes: usize,
    pub truncated: usize,
    pub embedding_batches_failed: usize,
    pub edges: usize,
    pub nodes_with_edges: usize,
    pub max_fan_out: usize,
    pub collection_created: bool,
    pub duration_ms: u64
}

impl BuildReport {
    /// Records that never reached the store, for any reason.
    pub fn total_skipped(&self) -> usize {
        self.skipped_invalid + self.skipped_duplicate + self.skipped_embedding + self.failed_writes
    }
}

/// Result of [`crate::GraphStore::ensure_indexes`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexReport {
    pub created: Vec<String>,
    pub existing: Vec<String>
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub backend: String,
    pub latency_ms: Option<u64>,
    pub message: Option<String>
}

impl HealthStatus {
    pub fn healthy(backend: &str) -> Self {
        Self {
            healthy: true,
            backend: backend.to_string(),
            latency_ms: None,
            message: None
        }
    }

    pub fn unhealthy(backend: &str, message: impl Into<String>) -> Self {
        Self {
            healthy: false,
            backend: backend.to_string(),
            latency_ms: None,
            message: Some(message.into())
        }
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = Some(latency_ms);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_vector_field_names() {
        assert_eq!(VectorField::Combined.as_str(), "combined_embedding");
        assert_eq!(VectorField::Question.to_string(), "question_embedding");
        assert_eq!(
            VectorField::from_str("answer_embedding").unwrap(),
            VectorField::Answer
        );
        assert_eq!(
            serde_json::to_string(&VectorField::Combined).unwrap(),
            "\"combined_embedding\""
        );
    }

    #[test]
    fn test_task_type_serialization() {
        assert_eq!(TaskType::GraphRag.to_string(), "graph_rag");
        assert_eq!(
            TaskType::from_str("comparative_analysis").unwrap(),
            TaskType::ComparativeAnalysis
        );
        assert_eq!(StepAction::GenerateResponse.to_string(), "generate_response");
    }

    #[test]
    fn test_step_for_iteration_repeats_last() {
        let plan = TaskPlan {
            task_type: TaskType::SimpleRetrieval,
            steps: vec![
                PlanStep {
                    index: 0,
                    action: StepAction::VectorRetrieval,
                    description: "search".to_string()
                },
                PlanStep {
                    index: 1,
                    action: StepAction::GenerateResponse,
                    description: "answer".to_string()
                },
            ],
            reasoning_required: false,
            expected_iterations: 1
        };

        assert_eq!(
            plan.step_for_iteration(0).unwrap().action,
            StepAction::VectorRetrieval
        );
        assert_eq!(
            plan.step_for_iteration(7).unwrap().action,
            StepAction::GenerateResponse
        );

        let empty = TaskPlan {
            steps: vec![],
            ..plan
        };
        assert!(empty.step_for_iteration(0).is_none());
    }

    #[test]
    fn test_retrieval_result_helpers() {
        let mut result = RetrievalResult::empty();
        assert!(result.is_empty());

        result.nodes.push(RetrievedNode::seed(QaRecord::new("a", "q", "r"), 0.9));
        result
            .nodes
            .push(RetrievedNode::traversal(QaRecord::new("b", "q", "r"), 1));

        assert_eq!(result.node_ids(), vec!["a", "b"]);
        assert_eq!(result.seed_count(), 1);
        assert_eq!(result.nodes[1].similarity, 0.0);
    }

    #[test]
    fn test_embeddings_dimension_check() {
        let emb = NodeEmbeddings {
            question: vec![0.0; 3],
            answer: vec![0.0; 3],
            combined: vec![0.0; 4]
        };
        assert!(!emb.has_dimension(3));
        assert_eq!(emb.get(VectorField::Combined).len(), 4);
    }
}
