//! Local on-disk document store with TF-IDF similarity search
//!
//! Fallback backend when the remote object store is unreachable. Documents
//! are appended to a JSONL file and re-read at open, so the fallback keeps
//! the write-once durability the remote would give.

use crate::objects::{Document, ScoredDocument};
use medgraph_core::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

const DOCS_FILE: &str = "documents.jsonl";

pub struct LocalStore {
    dir: PathBuf,
    docs: Vec<Document>,
}

impl LocalStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        let mut docs = Vec::new();
        let docs_path = dir.join(DOCS_FILE);
        if docs_path.exists() {
            for line in std::fs::read_to_string(&docs_path)?.lines() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Document>(line) {
                    Ok(doc) => docs.push(doc),
                    Err(e) => tracing::error!("Skipping corrupt document record: {}", e),
                }
            }
        }

        Ok(Self { dir, docs })
    }

    /// Insert a write-once document; duplicate ids are rejected.
    pub async fn put(&mut self, doc: Document) -> Result<()> {
        if self.docs.iter().any(|d| d.id == doc.id) {
            return Err(Error::ObjectStore(format!(
                "document already exists: {}",
                doc.id
            )));
        }

        let mut line = serde_json::to_string(&doc)?;
        line.push('\n');
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(DOCS_FILE))
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        self.docs.push(doc);
        Ok(())
    }

    /// TF-IDF cosine similarity over documents matching the metadata filter.
    pub fn query(
        &self,
        text: &str,
        filter: &HashMap<String, String>,
        top_k: usize,
    ) -> Vec<ScoredDocument> {
        let candidates: Vec<&Document> = self
            .docs
            .iter()
            .filter(|d| filter.iter().all(|(k, v)| d.metadata.get(k) == Some(v)))
            .collect();

        if candidates.is_empty() {
            return Vec::new();
        }

        let idf = compute_idf(&candidates);
        let query_vec = tfidf_vector(text, &idf);

        let mut scored: Vec<ScoredDocument> = candidates
            .iter()
            .map(|doc| ScoredDocument {
                document: (*doc).clone(),
                score: cosine(&query_vec, &tfidf_vector(&doc.text, &idf)),
            })
            .filter(|s| s.score > 0.0)
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        scored
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// Inverse document frequency over the candidate set.
fn compute_idf(docs: &[&Document]) -> HashMap<String, f32> {
    let total = docs.len() as f32;
    let mut df: HashMap<String, f32> = HashMap::new();
    for doc in docs {
        let unique: HashSet<String> = tokenize(&doc.text).into_iter().collect();
        for token in unique {
            *df.entry(token).or_insert(0.0) += 1.0;
        }
    }
    df.into_iter()
        .map(|(token, count)| (token, (total / count).ln() + 1.0))
        .collect()
}

fn tfidf_vector(text: &str, idf: &HashMap<String, f32>) -> HashMap<String, f32> {
    let tokens = tokenize(text);
    if tokens.is_empty() {
        return HashMap::new();
    }
    let mut tf: HashMap<String, f32> = HashMap::new();
    for token in &tokens {
        *tf.entry(token.clone()).or_insert(0.0) += 1.0;
    }
    let len = tokens.len() as f32;
    tf.into_iter()
        .map(|(token, count)| {
            let idf_val = idf.get(&token).copied().unwrap_or(1.0);
            (token, (count / len) * idf_val)
        })
        .collect()
}

fn cosine(a: &HashMap<String, f32>, b: &HashMap<String, f32>) -> f32 {
    let dot: f32 = a
        .iter()
        .filter_map(|(token, av)| b.get(token).map(|bv| av * bv))
        .sum();
    let mag_a: f32 = a.values().map(|v| v * v).sum::<f32>().sqrt();
    let mag_b: f32 = b.values().map(|v| v * v).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a * mag_b)
}
