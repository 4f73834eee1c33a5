//! # GraphRAG Core
//!
//! Shared types and capability traits for the medical GraphRAG system.
//!
//! This crate provides:
//! - The persisted node schema ([`QaRecord`]) and its three vector fields
//! - Transient per-query and per-build structures (retrieval results, task
//!   plans, build reports)
//! - Capability traits for the embedding model, the LLM and the graph store
//! - Cosine similarity used by both the builder and the in-memory store
//!
//! Every component receives its capabilities through its constructor; there
//! is no process-wide client state.

pub mod traits;
pub mod types;
pub mod vector;

pub use traits::{EmbeddingService, GraphStore, LlmService};
pub use types::{
    BuildReport, HealthStatus, IndexReport, NodeEmbeddings, NodeOrigin, PlanStep, QaRecord,
    RetrievalResult, RetrievedNode, ScoredRecord, SimilarityEdge, StepAction, TaskPlan, TaskType,
    TraversedEdge, VectorField
};
pub use vector::{cosine_similarity, cosine_with_norms, l2_norm};
