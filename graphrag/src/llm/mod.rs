pub mod fallback;
pub mod http;
pub mod mock;
pub mod response;

pub use fallback::FallbackLlm;
pub use http::OpenAiCompatibleLlm;
pub use mock::MockLlmService;
pub use response::CompletionResponse;
