//! Medgraph Store — evidence document store and claim graph
//!
//! Two stores with different durability stories:
//! - The object store prefers a remote Chroma-compatible service and falls
//!   back to a local on-disk store with the same put/query contract.
//! - The claim graph is authoritative in-process, written through to a JSON
//!   file on every mutation, and mirrored best-effort to Neo4j.

pub mod chroma;
pub mod graph;
pub mod local;
pub mod neo4j;
pub mod objects;

pub use graph::{ClaimGraph, GraphEdge, GraphNode, GraphSnapshot, Relation};
pub use objects::{Document, ObjectStore, ScoredDocument};
