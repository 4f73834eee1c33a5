//! Shared test fixtures for the medrag workspace.
//!
//! - A Qdrant container (ports 6333/6334), started lazily once per test
//!   process and cleaned up when the process exits
//! - Unique collection names
//! - A small medical Q&A corpus and hand-built vectors with known
//!   similarities

mod corpus;
mod fixtures;

pub use corpus::*;
pub use fixtures::*;
