//! Agent runner — the topic-driven research workflow
//!
//! From the orchestrator's point of view this is one opaque call:
//! run(topic) -> final report text. Internally the pipeline runs three
//! phases (search, verify, report) and merges extracted claims into the
//! claim graph as it goes. Tool failures arrive as text and are carried
//! into the evidence, never raised; only LLM failures abort the run.

use medgraph_core::{CochraneReport, Error, Result, TaskId, VerificationStatus};
use medgraph_llm::{ChatRequest, LlmProvider};
use medgraph_store::ClaimGraph;
use medgraph_tools::ToolRegistry;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

const MAX_SOURCES: usize = 3;
const MAX_SOURCE_CHARS: usize = 4000;

#[async_trait::async_trait]
pub trait AgentRunner: Send + Sync {
    /// Execute the full research workflow for a topic. Long-running and
    /// blocking from the runner's perspective; callers schedule it off
    /// the request-serving path.
    async fn run(&self, task_id: &TaskId, topic: &str) -> Result<String>;
}

/// Extracted claim, as the verification step reports it.
#[derive(Debug, Deserialize)]
struct ExtractedClaim {
    source: String,
    claim: String,
    #[serde(default = "default_strength")]
    evidence_strength: f64,
    #[serde(default = "default_verification")]
    verification: VerificationStatus,
}

fn default_strength() -> f64 {
    0.5
}

fn default_verification() -> VerificationStatus {
    VerificationStatus::Pending
}

#[derive(Debug, Deserialize)]
struct Findings {
    #[serde(flatten)]
    report: CochraneReport,
    #[serde(default)]
    claims: Vec<ExtractedClaim>,
    #[serde(default)]
    contradiction_pairs: Vec<(String, String)>,
}

pub struct ResearchPipeline {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    graph: Arc<ClaimGraph>,
    model: String,
}

impl ResearchPipeline {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        graph: Arc<ClaimGraph>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            tools,
            graph,
            model: model.into(),
        }
    }

    /// Phase 1: search for guidelines, scrape the top sources.
    async fn gather(&self, topic: &str) -> String {
        let search = self
            .tools
            .execute(
                "search",
                json!({ "query": format!("{} current Danish and international guidelines", topic) }),
            )
            .await;

        let mut evidence = String::new();
        let mut urls: Vec<String> = Vec::new();

        match &search {
            medgraph_tools::ToolResult::Json(results) => {
                if let Some(items) = results.as_array() {
                    for item in items.iter().take(MAX_SOURCES) {
                        if let Some(url) = item["url"].as_str() {
                            urls.push(url.to_string());
                        }
                        if let Some(content) = item["content"].as_str() {
                            evidence.push_str(content);
                            evidence.push('\n');
                        }
                    }
                }
            }
            other => {
                // Search degraded to text (missing key, network failure);
                // keep the message as context for the reviewer step.
                evidence.push_str(&other.to_content_string());
                evidence.push('\n');
            }
        }

        for url in urls {
            let scraped = self
                .tools
                .execute("scrape", json!({ "url": url }))
                .await
                .to_content_string();
            let excerpt: String = scraped.chars().take(MAX_SOURCE_CHARS).collect();
            evidence.push_str(&format!("\n--- Source: {} ---\n{}\n", url, excerpt));
        }

        evidence
    }

    /// Phase 2: PICO extraction, RoB 2.0 / GRADE assessment, contradiction
    /// detection. Returns the raw reviewer text and, when it parses, the
    /// structured findings.
    async fn verify(&self, topic: &str, evidence: &str) -> Result<(String, Option<Findings>)> {
        let request = ChatRequest::new(&self.model)
            .system(
                "You are a strict Cochrane methodologist. You classify evidence \
                 (RoB 2.0, GRADE), extract PICO elements, and detect contradictions. \
                 Respond with a single JSON object with keys: pico {population, \
                 intervention, comparison, outcome}, rob_score, grade_level, summary, \
                 key_findings [string], contradictions [string], claims [{source, \
                 claim, evidence_strength (0-1), verification \
                 (verified|contradicted|uncertain|pending)}], and \
                 contradiction_pairs [[claim, claim]].",
            )
            .user(format!(
                "Topic: {}\n\nGathered evidence:\n{}",
                topic, evidence
            ));

        let response = self
            .provider
            .complete(request)
            .await
            .map_err(|e| Error::workflow(e.to_string()))?;

        let findings = match extract_json(&response.content)
            .and_then(|v| serde_json::from_value::<Findings>(v).ok())
        {
            Some(f) => Some(f),
            None => {
                warn!("Verification output was not parseable as structured findings");
                None
            }
        };

        Ok((response.content, findings))
    }

    /// Merge verified claims and contradictions into the claim graph.
    async fn record(&self, findings: &Findings) -> Result<()> {
        for claim in &findings.claims {
            self.graph
                .add_claim(
                    &claim.source,
                    &claim.claim,
                    claim.evidence_strength,
                    claim.verification,
                )
                .await?;
        }
        for (a, b) in &findings.contradiction_pairs {
            self.graph.add_contradiction(a, b).await?;
        }
        Ok(())
    }

    /// Phase 3: compile the final markdown report.
    async fn report(&self, topic: &str, verification: &str) -> Result<String> {
        let request = ChatRequest::new(&self.model)
            .system(
                "You are a research supervisor for a medical evidence platform. \
                 Compile a final markdown report from the verified findings: \
                 summary, PICO table, evidence quality (RoB 2.0, GRADE), key \
                 findings, and any contradictions. Be evidence-based and concise.",
            )
            .user(format!(
                "Topic: {}\n\nVerified findings:\n{}",
                topic, verification
            ));

        let response = self
            .provider
            .complete(request)
            .await
            .map_err(|e| Error::workflow(e.to_string()))?;

        Ok(response.content)
    }
}

#[async_trait::async_trait]
impl AgentRunner for ResearchPipeline {
    async fn run(&self, task_id: &TaskId, topic: &str) -> Result<String> {
        info!("Research pipeline started: task={} topic={}", task_id, topic);

        let evidence = self.gather(topic).await;
        debug!("Gathered {} chars of evidence", evidence.len());

        let (verification, findings) = self.verify(topic, &evidence).await?;

        if let Some(findings) = &findings {
            self.record(findings).await?;
            info!(
                "Recorded {} claims, {} contradictions for task {} (GRADE: {})",
                findings.claims.len(),
                findings.contradiction_pairs.len(),
                task_id,
                findings.report.grade_level
            );
        }

        self.report(topic, &verification).await
    }
}

/// Pull the first JSON object out of a model response that may wrap it in
/// prose or a code fence.
fn extract_json(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_from_fenced_response() {
        let text = "Here you go:\n```json\n{\"summary\": \"ok\"}\n```";
        let value = extract_json(text).unwrap();
        assert_eq!(value["summary"], "ok");
    }

    #[test]
    fn extract_json_rejects_plain_prose() {
        assert!(extract_json("no structure here").is_none());
    }

    #[test]
    fn findings_parse_with_defaults() {
        let raw = json!({
            "pico": {
                "population": "adults with hypertension",
                "intervention": "ACE inhibitors",
                "outcome": "blood pressure control"
            },
            "rob_score": "low",
            "grade_level": "moderate",
            "summary": "s",
            "claims": [
                { "source": "https://example.org", "claim": "ACE inhibitors lower BP" }
            ]
        });
        let findings: Findings = serde_json::from_value(raw).unwrap();
        assert_eq!(findings.claims.len(), 1);
        assert_eq!(findings.claims[0].verification, VerificationStatus::Pending);
        assert!(findings.contradiction_pairs.is_empty());
    }
}
