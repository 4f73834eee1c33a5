//! # GraphRAG Errors
//!
//! Error taxonomy shared by every crate in the workspace.
//!
//! Errors fall into four groups:
//! - configuration errors, fatal at startup ([`ConfigurationError`])
//! - transient external failures, recovered locally ([`ProviderError`],
//!   most [`StoreError`] variants)
//! - data-quality problems, which are counted rather than raised
//! - exhaustion of the iterative loop, which is not an error at all

use thiserror::Error;

/// Configuration errors. Always fatal.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Missing credentials for {component}: {hint}")]
    MissingCredentials { component: String, hint: String },

    #[error("Dimension mismatch: embedding model produces {embedding}, store expects {store}")]
    DimensionMismatch { embedding: usize, store: usize },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Store schema mismatch on collection {collection}: {reason}")]
    SchemaMismatch { collection: String, reason: String }
}

/// Vector/graph store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store {backend} unavailable: {reason}")]
    Unavailable { backend: String, reason: String },

    #[error("Store operation {operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Store operation {operation} failed: {reason}")]
    Operation { operation: String, reason: String },

    #[error("Collection {collection} does not exist")]
    CollectionMissing { collection: String },

    #[error("Record {id} could not be decoded: {reason}")]
    Decode { id: String, reason: String },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError)
}

impl StoreError {
    pub fn operation(operation: impl Into<String>, reason: impl ToString) -> Self {
        Self::Operation {
            operation: operation.into(),
            reason: reason.to_string()
        }
    }

    /// Configuration problems and an unreachable store at startup are fatal.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::Unavailable { .. })
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Operation { .. } | Self::Unavailable { .. }
        )
    }
}

/// Failures of external capabilities (embedding model, LLM providers).
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Request to {provider} failed: {reason}")]
    Request { provider: String, reason: String },

    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String
    },

    #[error("{provider} call timed out after {timeout_ms}ms")]
    Timeout { provider: String, timeout_ms: u64 },

    #[error("Malformed response from {provider}: {reason}")]
    MalformedResponse { provider: String, reason: String },

    #[error("{provider} returned {actual}-dimensional vectors, expected {expected}")]
    DimensionMismatch {
        provider: String,
        expected: usize,
        actual: usize
    },

    #[error("All {attempted} providers failed, last error: {last}")]
    AllProvidersFailed { attempted: usize, last: String },

    #[error("No provider configured for {capability}")]
    NotConfigured { capability: String }
}

impl ProviderError {
    pub fn request(provider: impl Into<String>, reason: impl ToString) -> Self {
        Self::Request {
            provider: provider.into(),
            reason: reason.to_string()
        }
    }

    pub fn malformed(provider: impl Into<String>, reason: impl ToString) -> Self {
        Self::MalformedResponse {
            provider: provider.into(),
            reason: reason.to_string()
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request { .. } | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false
        }
    }
}

/// Offline graph build failures. Only the fatal ones surface here; per-batch
/// problems are counted in the build report instead.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("Store not usable at build start: {0}")]
    Store(#[from] StoreError),

    #[error("Similarity computation failed: {reason}")]
    Similarity { reason: String }
}

/// Reasoning oracle failures. The executor always recovers from these.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Oracle timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Oracle response could not be parsed: {reason}")]
    Parse { reason: String }
}

impl From<serde_json::Error> for OracleError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse {
            reason: err.to_string()
        }
    }
}
