//! # GraphRAG
//!
//! Similarity-graph construction over Q&A corpora and graph-augmented
//! retrieval at query time.
//!
//! - [`GraphBuilder`]: embeds a corpus, links records whose combined
//!   embeddings are similar, and persists nodes with their adjacency lists
//! - [`GraphRetriever`]: seed vector search followed by breadth-first
//!   expansion, rendered into an LLM context block
//! - [`embedding`] and [`llm`]: provider clients behind the `rag_core`
//!   capability traits

pub mod builder;
pub mod context;
pub mod corpus;
pub mod embedding;
pub mod llm;
pub mod retriever;
pub mod similarity;
pub mod telemetry;

pub use builder::{BuildOptions, GraphBuilder, combined_text};
pub use context::render_context;
pub use corpus::{Corpus, CorpusEntry, CorpusError, CorpusStats, load_jsonl, parse_jsonl, statistics};
pub use embedding::{HttpEmbeddingService, MockEmbeddingService};
pub use llm::{CompletionResponse, FallbackLlm, MockLlmService, OpenAiCompatibleLlm};
pub use retriever::{GraphRetriever, RetrieverSettings};
pub use telemetry::{GraphRagTelemetry, init_metrics_exporter};
