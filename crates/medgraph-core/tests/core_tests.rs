//! Tests for medgraph-core: task ids, status machine, records, domain models

use medgraph_core::*;

// ===========================================================================
// TaskId
// ===========================================================================

#[test]
fn task_id_new_and_display() {
    let id = TaskId::new("abc-123");
    assert_eq!(id.as_str(), "abc-123");
    assert_eq!(format!("{}", id), "abc-123");
}

#[test]
fn task_id_generate_is_unique() {
    let a = TaskId::generate();
    let b = TaskId::generate();
    assert_ne!(a, b);
}

#[test]
fn task_id_equality_and_hash() {
    use std::collections::HashSet;
    let a = TaskId::new("same");
    let b = TaskId::new("same");
    let c = TaskId::new("different");
    assert_eq!(a, b);
    assert_ne!(a, c);
    let mut set = HashSet::new();
    set.insert(a.clone());
    assert!(set.contains(&b));
    assert!(!set.contains(&c));
}

#[test]
fn task_id_serde_roundtrip() {
    let id = TaskId::new("task-1");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, r#""task-1""#);
    let back: TaskId = serde_json::from_str(&json).unwrap();
    assert_eq!(id, back);
}

// ===========================================================================
// TaskStatus
// ===========================================================================

#[test]
fn status_serializes_lowercase() {
    assert_eq!(
        serde_json::to_string(&TaskStatus::Pending).unwrap(),
        r#""pending""#
    );
    assert_eq!(
        serde_json::to_string(&TaskStatus::Running).unwrap(),
        r#""running""#
    );
    assert_eq!(
        serde_json::to_string(&TaskStatus::Completed).unwrap(),
        r#""completed""#
    );
    assert_eq!(
        serde_json::to_string(&TaskStatus::Failed).unwrap(),
        r#""failed""#
    );
}

#[test]
fn status_transitions_are_monotonic() {
    use TaskStatus::*;
    assert!(Pending.can_transition_to(Running));
    assert!(Running.can_transition_to(Completed));
    assert!(Running.can_transition_to(Failed));

    // No skipping, no re-entry, no leaving a terminal state.
    assert!(!Pending.can_transition_to(Completed));
    assert!(!Pending.can_transition_to(Failed));
    assert!(!Running.can_transition_to(Pending));
    assert!(!Completed.can_transition_to(Running));
    assert!(!Completed.can_transition_to(Failed));
    assert!(!Failed.can_transition_to(Running));
    assert!(!Failed.can_transition_to(Completed));
}

#[test]
fn status_terminal_states() {
    assert!(!TaskStatus::Pending.is_terminal());
    assert!(!TaskStatus::Running.is_terminal());
    assert!(TaskStatus::Completed.is_terminal());
    assert!(TaskStatus::Failed.is_terminal());
}

// ===========================================================================
// TaskRecord
// ===========================================================================

#[test]
fn task_record_starts_pending_and_empty() {
    let record = TaskRecord::new(TaskId::new("t1"), "hypertension guidelines");
    assert_eq!(record.status, TaskStatus::Pending);
    assert_eq!(record.topic, "hypertension guidelines");
    assert!(record.logs.is_empty());
    assert!(record.result.is_none());
}

#[test]
fn task_record_serializes_without_null_result() {
    let record = TaskRecord::new(TaskId::new("t1"), "topic");
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["task_id"], "t1");
    assert_eq!(json["status"], "pending");
    assert!(json.get("result").is_none());
}

// ===========================================================================
// Domain models
// ===========================================================================

#[test]
fn verification_status_serde() {
    let json = serde_json::to_string(&VerificationStatus::Contradicted).unwrap();
    assert_eq!(json, r#""contradicted""#);
    let back: VerificationStatus = serde_json::from_str(r#""pending""#).unwrap();
    assert_eq!(back, VerificationStatus::Pending);
}

#[test]
fn evidence_level_snake_case() {
    assert_eq!(
        serde_json::to_string(&EvidenceLevel::VeryLow).unwrap(),
        r#""very_low""#
    );
}

#[test]
fn cochrane_report_parses_with_optional_fields() {
    let raw = serde_json::json!({
        "pico": {
            "population": "adults with type 2 diabetes",
            "intervention": "SGLT2 inhibitors",
            "outcome": "HbA1c reduction"
        },
        "rob_score": "some concerns",
        "grade_level": "moderate",
        "summary": "Consistent benefit across trials."
    });
    let report: CochraneReport = serde_json::from_value(raw).unwrap();
    assert!(report.pico.comparison.is_none());
    assert!(report.contradictions.is_empty());
    assert!(report.key_findings.is_empty());
}

// ===========================================================================
// Config
// ===========================================================================

#[test]
fn config_defaults() {
    let config = Config::default();
    assert_eq!(config.object_store.host, "chroma");
    assert_eq!(config.object_store.port, 8000);
    assert_eq!(config.object_store.collection, "medical_evidence");
    assert_eq!(config.graph_db.uri, "http://neo4j:7474");
    assert_eq!(config.workflow_timeout_secs, 600);
    assert_eq!(config.task_capacity, 1024);
    assert!(config.llm.api_key.is_none());
}

#[test]
fn object_store_base_url() {
    let config = Config::default();
    assert_eq!(config.object_store.base_url(), "http://chroma:8000");
}
