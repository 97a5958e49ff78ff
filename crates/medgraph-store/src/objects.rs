//! Object store adapter — remote-first with transparent local fallback
//!
//! Callers see the same put/query contract whichever backend is live.
//! Backend selection happens once at connect time: if the remote service
//! is unreachable the store drops to the local directory and logs a single
//! degraded-mode warning.

use crate::chroma::ChromaClient;
use crate::local::LocalStore;
use medgraph_core::config::ObjectStoreConfig;
use medgraph_core::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// A write-once evidence document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub metadata: HashMap<String, String>,
}

#[derive(Clone, Debug)]
pub struct ScoredDocument {
    pub document: Document,
    pub score: f32,
}

enum Backend {
    Remote(ChromaClient),
    Local(Mutex<LocalStore>),
}

pub struct ObjectStore {
    backend: Backend,
}

impl ObjectStore {
    /// Prefer the remote service; fall back to the local directory.
    pub async fn connect(config: &ObjectStoreConfig) -> Result<Self> {
        match ChromaClient::connect(config).await {
            Ok(client) => {
                info!("Connected to object store at {}", config.base_url());
                Ok(Self {
                    backend: Backend::Remote(client),
                })
            }
            Err(e) => {
                warn!(
                    "Could not connect to object store: {}. Using local fallback at {}",
                    e,
                    config.fallback_dir.display()
                );
                Self::local(&config.fallback_dir)
            }
        }
    }

    /// Local-only store, used as the fallback backend and in tests.
    pub fn local(dir: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            backend: Backend::Local(Mutex::new(LocalStore::open(dir)?)),
        })
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.backend, Backend::Remote(_))
    }

    /// Insert a write-once document.
    pub async fn put(
        &self,
        id: impl Into<String>,
        text: impl Into<String>,
        metadata: HashMap<String, String>,
    ) -> Result<()> {
        let doc = Document {
            id: id.into(),
            text: text.into(),
            metadata,
        };
        match &self.backend {
            Backend::Remote(client) => client.add(&doc).await,
            Backend::Local(store) => store.lock().await.put(doc).await,
        }
    }

    /// Similarity search constrained by metadata equality.
    pub async fn query(
        &self,
        text: &str,
        filter: &HashMap<String, String>,
        top_k: usize,
    ) -> Result<Vec<ScoredDocument>> {
        match &self.backend {
            Backend::Remote(client) => client.query(text, filter, top_k).await,
            Backend::Local(store) => Ok(store.lock().await.query(text, filter, top_k)),
        }
    }
}
