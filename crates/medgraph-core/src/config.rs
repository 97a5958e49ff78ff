//! Environment-driven configuration.
//!
//! Every backend is optional: missing credentials or unreachable services
//! degrade to a local mode at startup instead of failing the process.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Object store backend (Chroma-compatible HTTP service).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    pub host: String,
    pub port: u16,
    pub collection: String,
    /// Local fallback directory when the remote service is unreachable.
    pub fallback_dir: PathBuf,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            host: "chroma".to_string(),
            port: 8000,
            collection: "medical_evidence".to_string(),
            fallback_dir: PathBuf::from("./chroma_data"),
        }
    }
}

impl ObjectStoreConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Remote graph database (Neo4j HTTP endpoint). Best-effort mirror only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GraphDbConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
}

impl Default for GraphDbConfig {
    fn default() -> Self {
        Self {
            uri: "http://neo4j:7474".to_string(),
            user: "neo4j".to_string(),
            password: "password".to_string(),
        }
    }
}

/// LLM provider selection: xAI preferred, OpenAI fallback.
#[derive(Clone, Debug, Default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
}

/// Top-level configuration, resolved from the environment once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub object_store: ObjectStoreConfig,
    pub graph_db: GraphDbConfig,
    pub graph_file: PathBuf,
    pub llm: LlmConfig,
    pub tavily_api_key: Option<String>,
    /// Hard bound on a single workflow run, in seconds.
    pub workflow_timeout_secs: u64,
    /// Capacity bound on the in-memory task table.
    pub task_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            object_store: ObjectStoreConfig::default(),
            graph_db: GraphDbConfig::default(),
            graph_file: PathBuf::from("graph_data.json"),
            llm: LlmConfig {
                api_key: None,
                base_url: None,
                model: "grok-beta".to_string(),
            },
            tavily_api_key: None,
            workflow_timeout_secs: 600,
            task_capacity: 1024,
        }
    }
}

impl Config {
    /// Resolve configuration from environment variables, keeping the
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("CHROMA_HOST") {
            config.object_store.host = host;
        }
        if let Some(port) = std::env::var("CHROMA_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
        {
            config.object_store.port = port;
        }
        if let Ok(dir) = std::env::var("MEDGRAPH_DATA_DIR") {
            config.object_store.fallback_dir = PathBuf::from(dir);
        }

        if let Ok(uri) = std::env::var("NEO4J_URI") {
            config.graph_db.uri = uri;
        }
        if let Ok(user) = std::env::var("NEO4J_USER") {
            config.graph_db.user = user;
        }
        if let Ok(password) = std::env::var("NEO4J_PASSWORD") {
            config.graph_db.password = password;
        }
        if let Ok(file) = std::env::var("MEDGRAPH_GRAPH_FILE") {
            config.graph_file = PathBuf::from(file);
        }

        // xAI preferred; OpenAI as fallback, matching its default base URL.
        if let Ok(key) = std::env::var("XAI_API_KEY") {
            config.llm.api_key = Some(key);
            config.llm.base_url = Some("https://api.x.ai/v1".to_string());
        } else if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.llm.api_key = Some(key);
            config.llm.base_url = Some("https://api.openai.com/v1".to_string());
            config.llm.model = "gpt-4o-mini".to_string();
        }
        if let Ok(model) = std::env::var("MEDGRAPH_MODEL") {
            config.llm.model = model;
        }

        config.tavily_api_key = std::env::var("TAVILY_API_KEY").ok();

        if let Some(secs) = std::env::var("MEDGRAPH_WORKFLOW_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.workflow_timeout_secs = secs;
        }
        if let Some(cap) = std::env::var("MEDGRAPH_TASK_CAPACITY")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.task_capacity = cap;
        }

        config
    }
}
