//! # Graph Store Adapters
//!
//! Implementations of [`rag_core::GraphStore`]:
//! - [`QdrantGraphStore`]: Qdrant collection with three named vectors per point
//! - [`InMemoryGraphStore`]: process-local store for tests and small corpora

pub mod in_memory;
pub mod qdrant;

pub use in_memory::InMemoryGraphStore;
pub use qdrant::QdrantGraphStore;
