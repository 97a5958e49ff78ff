//! Neo4j HTTP transaction client — best-effort graph mirror
//!
//! Speaks the transactional Cypher endpoint. Connectivity is verified once
//! at startup; callers treat every later failure as non-fatal.

use medgraph_core::config::GraphDbConfig;
use medgraph_core::{Error, Result, VerificationStatus};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

pub struct Neo4jClient {
    client: Client,
    tx_url: String,
    user: String,
    password: String,
}

impl Neo4jClient {
    /// Connect and verify with a trivial query.
    pub async fn connect(config: &GraphDbConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::GraphStore(e.to_string()))?;

        let neo4j = Self {
            client,
            tx_url: format!("{}/db/neo4j/tx/commit", config.uri.trim_end_matches('/')),
            user: config.user.clone(),
            password: config.password.clone(),
        };

        neo4j.run("RETURN 1", json!({})).await?;
        Ok(neo4j)
    }

    pub async fn merge_claim(
        &self,
        source: &str,
        claim: &str,
        weight: f64,
        verification: VerificationStatus,
    ) -> Result<()> {
        self.run(
            "MERGE (s:Source {url: $source}) \
             MERGE (c:Claim {text: $claim}) \
             SET c.verification = $verification \
             MERGE (s)-[r:ASSERTS]->(c) \
             SET r.weight = $weight",
            json!({
                "source": source,
                "claim": claim,
                "verification": verification.as_str(),
                "weight": weight,
            }),
        )
        .await
    }

    pub async fn merge_contradiction(&self, claim1: &str, claim2: &str) -> Result<()> {
        self.run(
            "MERGE (c1:Claim {text: $c1}) \
             MERGE (c2:Claim {text: $c2}) \
             MERGE (c1)-[:CONTRADICTS]-(c2)",
            json!({ "c1": claim1, "c2": claim2 }),
        )
        .await
    }

    async fn run(&self, statement: &str, parameters: Value) -> Result<()> {
        debug!("neo4j: {}", statement);

        let body = json!({
            "statements": [{ "statement": statement, "parameters": parameters }]
        });

        let response = self
            .client
            .post(&self.tx_url)
            .basic_auth(&self.user, Some(&self.password))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::GraphStore(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::GraphStore(format!(
                "neo4j returned {}",
                response.status()
            )));
        }

        // The endpoint reports per-statement errors with a 200 status.
        let result: Value = response
            .json()
            .await
            .map_err(|e| Error::GraphStore(e.to_string()))?;
        if let Some(errors) = result.get("errors").and_then(|e| e.as_array()) {
            if let Some(first) = errors.first() {
                return Err(Error::GraphStore(first.to_string()));
            }
        }

        Ok(())
    }
}
