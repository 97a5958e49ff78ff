//! LLM Provider trait

use crate::types::{ChatRequest, ChatResponse};

/// Result type for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;

/// LLM error types
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("no api key configured")]
    MissingApiKey,

    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

/// LLM Provider trait. One blocking chat completion per call; the
/// research pipeline treats the model as an opaque text-in/text-out step.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, request: ChatRequest) -> LlmResult<ChatResponse>;
}
