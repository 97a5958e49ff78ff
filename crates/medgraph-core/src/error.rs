//! Error types for Medgraph

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("workflow failed: {0}")]
    WorkflowFailed(String),

    #[error("workflow timed out after {0}s")]
    WorkflowTimeout(u64),

    #[error("object store error: {0}")]
    ObjectStore(String),

    #[error("graph store error: {0}")]
    GraphStore(String),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid_transition(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::InvalidTransition {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn workflow(message: impl Into<String>) -> Self {
        Self::WorkflowFailed(message.into())
    }
}
