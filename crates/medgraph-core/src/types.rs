//! Core types for Medgraph

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Task identifier - cheaply cloneable
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct TaskId(Arc<str>);

impl TaskId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(Arc::from(s.into()))
    }

    /// Allocate a fresh random id.
    pub fn generate() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl Serialize for TaskId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::new(String::deserialize(deserializer)?))
    }
}

/// Task lifecycle status
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Transitions are monotonic: pending -> running -> {completed, failed}.
    /// A terminal task never transitions again.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::Running)
                | (TaskStatus::Running, TaskStatus::Completed)
                | (TaskStatus::Running, TaskStatus::Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A research task record. Owned exclusively by the task registry;
/// only the orchestrator driving the task mutates it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: TaskId,
    pub topic: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub logs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

impl TaskRecord {
    pub fn new(task_id: TaskId, topic: impl Into<String>) -> Self {
        Self {
            task_id,
            topic: topic.into(),
            status: TaskStatus::Pending,
            created_at: Utc::now(),
            logs: Vec::new(),
            result: None,
        }
    }
}

/// GRADE certainty level
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceLevel {
    High,
    Moderate,
    Low,
    VeryLow,
}

/// Claim verification status
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Verified,
    Contradicted,
    Uncertain,
    Pending,
}

impl VerificationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            VerificationStatus::Verified => "verified",
            VerificationStatus::Contradicted => "contradicted",
            VerificationStatus::Uncertain => "uncertain",
            VerificationStatus::Pending => "pending",
        }
    }
}

/// PICO evidence-summary schema
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Pico {
    /// Patient population or problem
    pub population: String,
    /// Intervention or exposure
    pub intervention: String,
    /// Comparison intervention
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison: Option<String>,
    /// Outcome of interest
    pub outcome: String,
}

/// Source provenance for a scraped guideline page
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub url: String,
    pub title: String,
    pub domain: String,
    pub date_accessed: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<String>,
    #[serde(default)]
    pub credibility_score: f64,
    #[serde(default)]
    pub is_paywalled: bool,
}

/// Structured review output: PICO, RoB 2.0, GRADE, contradictions
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CochraneReport {
    pub pico: Pico,
    /// Risk of Bias 2.0 score
    pub rob_score: String,
    /// GRADE certainty level
    pub grade_level: String,
    pub summary: String,
    #[serde(default)]
    pub contradictions: Vec<String>,
    #[serde(default)]
    pub key_findings: Vec<String>,
}
