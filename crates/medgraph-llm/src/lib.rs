//! Medgraph LLM — provider trait and OpenAI-compatible chat client

pub mod openai;
pub mod provider;
pub mod types;

pub use openai::OpenAiCompatProvider;
pub use provider::{LlmError, LlmProvider, LlmResult};
pub use types::{ChatMessage, ChatRequest, ChatResponse, Usage};
