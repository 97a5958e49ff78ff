//! Claim graph — sources, claims, asserts/contradicts relations
//!
//! The in-process graph is the source of truth. Every mutation rewrites the
//! whole graph to disk before returning (write-through, O(graph) per write),
//! so a crash never loses more than the write in flight. The Neo4j mirror is
//! strictly a secondary index: its failures are logged and swallowed.
//!
//! Node identity is the natural key (source URL or claim text); inserting an
//! existing key merges instead of duplicating.

use crate::neo4j::Neo4jClient;
use medgraph_core::config::GraphDbConfig;
use medgraph_core::{Error, Result, VerificationStatus};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// A node in the claim graph, keyed by its natural identity.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GraphNode {
    Source { url: String },
    Claim {
        text: String,
        verification: VerificationStatus,
    },
}

impl GraphNode {
    pub fn key(&self) -> &str {
        match self {
            GraphNode::Source { url } => url,
            GraphNode::Claim { text, .. } => text,
        }
    }
}

/// Edge relation. Asserts carries an evidence-strength weight;
/// Contradicts has undirected semantics.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "relation", rename_all = "lowercase")]
pub enum Relation {
    Asserts { weight: f64 },
    Contradicts,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    #[serde(flatten)]
    pub relation: Relation,
}

/// Point-in-time export of the full graph, suitable for JSON clients.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct GraphState {
    nodes: HashMap<String, GraphNode>,
    edges: Vec<GraphEdge>,
}

impl GraphState {
    fn merge_node(&mut self, node: GraphNode) {
        let key = node.key().to_string();
        match self.nodes.entry(key) {
            // Existing claim: take the latest verification, keep identity.
            Entry::Occupied(mut entry) => {
                if let (
                    GraphNode::Claim { verification, .. },
                    GraphNode::Claim {
                        verification: latest,
                        ..
                    },
                ) = (entry.get_mut(), &node)
                {
                    *verification = *latest;
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(node);
            }
        }
    }

    /// Merge an asserts edge; last write wins on the weight.
    fn merge_asserts(&mut self, from: &str, to: &str, weight: f64) {
        for edge in &mut self.edges {
            if edge.from == from && edge.to == to {
                if let Relation::Asserts { weight: w } = &mut edge.relation {
                    *w = weight;
                    return;
                }
            }
        }
        self.edges.push(GraphEdge {
            from: from.to_string(),
            to: to.to_string(),
            relation: Relation::Asserts { weight },
        });
    }

    /// Merge an undirected contradicts edge (either orientation matches).
    fn merge_contradicts(&mut self, a: &str, b: &str) {
        let exists = self.edges.iter().any(|e| {
            matches!(e.relation, Relation::Contradicts)
                && ((e.from == a && e.to == b) || (e.from == b && e.to == a))
        });
        if !exists {
            self.edges.push(GraphEdge {
                from: a.to_string(),
                to: b.to_string(),
                relation: Relation::Contradicts,
            });
        }
    }
}

pub struct ClaimGraph {
    state: Mutex<GraphState>,
    path: PathBuf,
    remote: Option<Neo4jClient>,
}

impl ClaimGraph {
    /// Open the graph: load the serialized state from disk (absence or
    /// corruption falls back to an empty graph) and probe the remote mirror
    /// once. No reconnection is attempted after startup.
    pub async fn open(path: impl AsRef<Path>, remote: &GraphDbConfig) -> Self {
        let mut graph = Self::local(path);

        match Neo4jClient::connect(remote).await {
            Ok(client) => {
                info!("Connected to Neo4j at {}", remote.uri);
                graph.remote = Some(client);
            }
            Err(e) => {
                warn!("Could not connect to Neo4j: {}. Using local graph only.", e);
            }
        }

        graph
    }

    /// Open in local-only mode, never touching the network.
    pub fn local(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let state = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(state) => state,
                Err(e) => {
                    error!("Failed to parse graph file {}: {}", path.display(), e);
                    GraphState::default()
                }
            },
            Err(_) => GraphState::default(),
        };

        Self {
            state: Mutex::new(state),
            path,
            remote: None,
        }
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Merge a source, a claim, and the asserts edge between them.
    /// Idempotent on (source, claim); verification and weight are
    /// last-write-wins.
    pub async fn add_claim(
        &self,
        source: &str,
        claim: &str,
        strength: f64,
        verification: VerificationStatus,
    ) -> Result<()> {
        {
            // Single critical section: read-merge-write-serialize.
            let mut state = self.state.lock().await;
            state.merge_node(GraphNode::Source {
                url: source.to_string(),
            });
            state.merge_node(GraphNode::Claim {
                text: claim.to_string(),
                verification,
            });
            state.merge_asserts(source, claim, strength);
            self.persist(&state).await?;
        }

        // Mirror outside the lock: the remote is never authoritative.
        if let Some(remote) = &self.remote {
            if let Err(e) = remote.merge_claim(source, claim, strength, verification).await {
                error!("Neo4j write failed: {}", e);
            }
        }

        Ok(())
    }

    /// Merge an undirected contradicts edge. Unknown claims are created
    /// with pending verification rather than silently dropped.
    pub async fn add_contradiction(&self, claim1: &str, claim2: &str) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            for claim in [claim1, claim2] {
                if !state.nodes.contains_key(claim) {
                    state.merge_node(GraphNode::Claim {
                        text: claim.to_string(),
                        verification: VerificationStatus::Pending,
                    });
                }
            }
            state.merge_contradicts(claim1, claim2);
            self.persist(&state).await?;
        }

        if let Some(remote) = &self.remote {
            if let Err(e) = remote.merge_contradiction(claim1, claim2).await {
                error!("Neo4j write failed: {}", e);
            }
        }

        Ok(())
    }

    /// Immutable point-in-time export of the full graph.
    pub async fn snapshot(&self) -> GraphSnapshot {
        let state = self.state.lock().await;
        let mut nodes: Vec<GraphNode> = state.nodes.values().cloned().collect();
        nodes.sort_by(|a, b| a.key().cmp(b.key()));
        GraphSnapshot {
            nodes,
            edges: state.edges.clone(),
        }
    }

    pub async fn node_count(&self) -> usize {
        self.state.lock().await.nodes.len()
    }

    pub async fn edge_count(&self) -> usize {
        self.state.lock().await.edges.len()
    }

    /// Write-through serialization: temp file + rename, so a crash leaves
    /// either the old or the new graph on disk, never a torn file.
    /// Async file io keeps the executor free while the lock is held.
    async fn persist(&self, state: &GraphState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(Error::IoError)?;
        Ok(())
    }
}
