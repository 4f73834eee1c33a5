pub mod http;
pub mod mock;

pub use http::HttpEmbeddingService;
pub use mock::MockEmbeddingService;
