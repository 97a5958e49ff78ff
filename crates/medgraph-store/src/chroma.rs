//! Chroma HTTP client — remote object store backend

use crate::objects::{Document, ScoredDocument};
use medgraph_core::config::ObjectStoreConfig;
use medgraph_core::{Error, Result};
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

pub struct ChromaClient {
    client: Client,
    base_url: String,
    collection_id: String,
}

impl ChromaClient {
    /// Connect and get-or-create the evidence collection.
    pub async fn connect(config: &ObjectStoreConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::ObjectStore(e.to_string()))?;

        let base_url = config.base_url();
        let response = client
            .post(format!("{}/api/v1/collections", base_url))
            .json(&json!({ "name": config.collection, "get_or_create": true }))
            .send()
            .await
            .map_err(|e| Error::ObjectStore(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::ObjectStore(format!(
                "collection create returned {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::ObjectStore(e.to_string()))?;
        let collection_id = body["id"]
            .as_str()
            .ok_or_else(|| Error::ObjectStore("collection response missing id".to_string()))?
            .to_string();

        debug!("chroma collection {} -> {}", config.collection, collection_id);

        Ok(Self {
            client,
            base_url,
            collection_id,
        })
    }

    pub async fn add(&self, doc: &Document) -> Result<()> {
        let response = self
            .client
            .post(format!(
                "{}/api/v1/collections/{}/add",
                self.base_url, self.collection_id
            ))
            .json(&json!({
                "ids": [&doc.id],
                "documents": [&doc.text],
                "metadatas": [&doc.metadata],
            }))
            .send()
            .await
            .map_err(|e| Error::ObjectStore(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::ObjectStore(format!(
                "add returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    pub async fn query(
        &self,
        text: &str,
        filter: &HashMap<String, String>,
        top_k: usize,
    ) -> Result<Vec<ScoredDocument>> {
        let mut body = json!({
            "query_texts": [text],
            "n_results": top_k,
            "include": ["documents", "metadatas", "distances"],
        });
        if !filter.is_empty() {
            body["where"] = json!(filter);
        }

        let response = self
            .client
            .post(format!(
                "{}/api/v1/collections/{}/query",
                self.base_url, self.collection_id
            ))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::ObjectStore(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::ObjectStore(format!(
                "query returned {}",
                response.status()
            )));
        }

        let result: Value = response
            .json()
            .await
            .map_err(|e| Error::ObjectStore(e.to_string()))?;

        let ids = first_batch(&result["ids"]);
        let documents = first_batch(&result["documents"]);
        let metadatas = first_batch(&result["metadatas"]);
        let distances = first_batch(&result["distances"]);

        let mut out = Vec::new();
        for (i, id) in ids.iter().enumerate() {
            let Some(id) = id.as_str() else { continue };
            let text = documents
                .get(i)
                .and_then(|d| d.as_str())
                .unwrap_or_default()
                .to_string();
            let metadata: HashMap<String, String> = metadatas
                .get(i)
                .and_then(|m| m.as_object())
                .map(|o| {
                    o.iter()
                        .map(|(k, v)| {
                            let v = v.as_str().map(String::from).unwrap_or_else(|| v.to_string());
                            (k.clone(), v)
                        })
                        .collect()
                })
                .unwrap_or_default();
            let distance = distances.get(i).and_then(|d| d.as_f64()).unwrap_or(1.0);

            out.push(ScoredDocument {
                document: Document {
                    id: id.to_string(),
                    text,
                    metadata,
                },
                score: (1.0 - distance) as f32,
            });
        }
        Ok(out)
    }
}

/// Chroma nests every result list one level per query text.
fn first_batch(value: &Value) -> Vec<Value> {
    value
        .as_array()
        .and_then(|outer| outer.first())
        .and_then(|inner| inner.as_array())
        .cloned()
        .unwrap_or_default()
}
