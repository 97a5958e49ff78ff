//! Tests for medgraph-agent: task registry state machine, orchestrator
//! lifecycle, and the status event stream

use futures::StreamExt;
use medgraph_agent::{task_events, AgentRunner, Orchestrator, TaskEvent, TaskRegistry};
use medgraph_core::{Error, Result, TaskId, TaskStatus};
use medgraph_store::ObjectStore;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const POLL: Duration = Duration::from_millis(10);

struct OkRunner;

#[async_trait::async_trait]
impl AgentRunner for OkRunner {
    async fn run(&self, _task_id: &TaskId, topic: &str) -> Result<String> {
        Ok(format!("# Report\n\nFindings on {}", topic))
    }
}

struct FailRunner;

#[async_trait::async_trait]
impl AgentRunner for FailRunner {
    async fn run(&self, _task_id: &TaskId, _topic: &str) -> Result<String> {
        Err(Error::workflow("search tool exploded"))
    }
}

struct SlowRunner;

#[async_trait::async_trait]
impl AgentRunner for SlowRunner {
    async fn run(&self, _task_id: &TaskId, _topic: &str) -> Result<String> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok("too late".to_string())
    }
}

fn orchestrator(
    runner: impl AgentRunner + 'static,
    dir: &tempfile::TempDir,
    timeout: Duration,
) -> (Arc<Orchestrator>, Arc<TaskRegistry>, Arc<ObjectStore>) {
    let registry = Arc::new(TaskRegistry::new(64));
    let objects = Arc::new(ObjectStore::local(dir.path()).unwrap());
    let orchestrator = Arc::new(Orchestrator::new(
        registry.clone(),
        Arc::new(runner),
        objects.clone(),
        timeout,
    ));
    (orchestrator, registry, objects)
}

async fn wait_terminal(registry: &TaskRegistry, task_id: &TaskId) -> TaskStatus {
    for _ in 0..500 {
        if let Some(record) = registry.get(task_id) {
            if record.status.is_terminal() {
                return record.status;
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("task never reached a terminal state");
}

// ===========================================================================
// Task registry
// ===========================================================================

#[test]
fn create_issues_fresh_ids_and_pending_records() {
    let registry = TaskRegistry::new(16);
    let a = registry.create("topic a");
    let b = registry.create("topic b");
    assert_ne!(a, b);

    let record = registry.get(&a).unwrap();
    assert_eq!(record.status, TaskStatus::Pending);
    assert_eq!(record.topic, "topic a");
    assert!(record.logs.is_empty());
}

#[test]
fn append_log_preserves_order() {
    let registry = TaskRegistry::new(16);
    let id = registry.create("topic");
    registry.append_log(&id, "first").unwrap();
    registry.append_log(&id, "second").unwrap();
    registry.append_log(&id, "third").unwrap();

    let record = registry.get(&id).unwrap();
    assert_eq!(record.logs, vec!["first", "second", "third"]);
}

#[test]
fn append_log_unknown_task_errors() {
    let registry = TaskRegistry::new(16);
    let err = registry
        .append_log(&TaskId::new("nope"), "message")
        .unwrap_err();
    assert!(matches!(err, Error::TaskNotFound(_)));
}

#[test]
fn transition_enforces_monotonic_order() {
    let registry = TaskRegistry::new(16);
    let id = registry.create("topic");

    // Skipping running is rejected.
    assert!(registry.transition(&id, TaskStatus::Completed).is_err());

    registry.transition(&id, TaskStatus::Running).unwrap();
    registry.transition(&id, TaskStatus::Completed).unwrap();

    // Terminal tasks never transition again.
    assert!(registry.transition(&id, TaskStatus::Running).is_err());
    assert!(registry.transition(&id, TaskStatus::Failed).is_err());
    assert_eq!(
        registry.get(&id).unwrap().status,
        TaskStatus::Completed
    );
}

#[test]
fn capacity_evicts_only_terminal_tasks() {
    let registry = TaskRegistry::new(2);
    let done = registry.create("old done task");
    registry.transition(&done, TaskStatus::Running).unwrap();
    registry.transition(&done, TaskStatus::Completed).unwrap();

    let live = registry.create("still running");
    registry.transition(&live, TaskStatus::Running).unwrap();

    // At capacity: the terminal record goes, the live one stays.
    let new = registry.create("new topic");
    assert!(registry.get(&done).is_none());
    assert!(registry.get(&live).is_some());
    assert!(registry.get(&new).is_some());
}

#[test]
fn capacity_never_drops_live_tasks() {
    let registry = TaskRegistry::new(2);
    let a = registry.create("a");
    let b = registry.create("b");
    registry.transition(&a, TaskStatus::Running).unwrap();
    registry.transition(&b, TaskStatus::Running).unwrap();

    // No terminal task to evict: the table grows instead.
    let c = registry.create("c");
    assert_eq!(registry.len(), 3);
    assert!(registry.get(&a).is_some());
    assert!(registry.get(&c).is_some());
}

// ===========================================================================
// Orchestrator
// ===========================================================================

#[tokio::test]
async fn submit_returns_immediately_with_pending_task() {
    let dir = tempfile::tempdir().unwrap();
    let (orch, registry, _) = orchestrator(SlowRunner, &dir, Duration::from_secs(60));

    let id = orch.submit("hypertension guidelines");
    let record = registry.get(&id).unwrap();
    // The workflow has not produced a terminal state yet.
    assert!(!record.status.is_terminal());
    assert_eq!(record.topic, "hypertension guidelines");
}

#[tokio::test]
async fn successful_run_completes_and_stores_result() {
    let dir = tempfile::tempdir().unwrap();
    let (orch, registry, objects) = orchestrator(OkRunner, &dir, Duration::from_secs(5));

    let id = orch.submit("hypertension guidelines");
    let status = wait_terminal(&registry, &id).await;
    assert_eq!(status, TaskStatus::Completed);

    let record = registry.get(&id).unwrap();
    let result = record.result.unwrap();
    assert!(result["output"]
        .as_str()
        .unwrap()
        .contains("hypertension guidelines"));
    assert_eq!(record.logs.first().unwrap(), "Starting research crew...");
    assert_eq!(record.logs.last().unwrap(), "Research completed successfully.");

    // Exactly one document tagged with the task id.
    let mut filter = HashMap::new();
    filter.insert("task_id".to_string(), id.to_string());
    // put() happens after the terminal transition; give it a beat.
    let mut docs = Vec::new();
    for _ in 0..100 {
        docs = objects.query("Report", &filter, 10).await.unwrap();
        if !docs.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].document.metadata["topic"], "hypertension guidelines");
}

#[tokio::test]
async fn failed_run_ends_failed_with_error_log_and_no_document() {
    let dir = tempfile::tempdir().unwrap();
    let (orch, registry, objects) = orchestrator(FailRunner, &dir, Duration::from_secs(5));

    let id = orch.submit("topic");
    let status = wait_terminal(&registry, &id).await;
    assert_eq!(status, TaskStatus::Failed);

    let record = registry.get(&id).unwrap();
    assert!(record.result.is_none());
    let error_log = record.logs.last().unwrap();
    assert!(error_log.starts_with("Error:"));
    assert!(error_log.contains("search tool exploded"));

    let mut filter = HashMap::new();
    filter.insert("task_id".to_string(), id.to_string());
    let docs = objects.query("anything", &filter, 10).await.unwrap();
    assert!(docs.is_empty());
}

#[tokio::test]
async fn timed_out_run_ends_failed() {
    let dir = tempfile::tempdir().unwrap();
    let (orch, registry, _) = orchestrator(SlowRunner, &dir, Duration::from_millis(50));

    let id = orch.submit("topic");
    let status = wait_terminal(&registry, &id).await;
    assert_eq!(status, TaskStatus::Failed);

    let record = registry.get(&id).unwrap();
    assert!(record.logs.last().unwrap().contains("timed out"));
}

// ===========================================================================
// Status stream
// ===========================================================================

#[tokio::test]
async fn stream_for_unknown_task_fails_immediately() {
    let registry = Arc::new(TaskRegistry::new(16));
    let result = task_events(registry, TaskId::new("missing"), POLL);
    assert!(matches!(result, Err(Error::TaskNotFound(_))));
}

#[tokio::test]
async fn stream_emits_logs_then_status_then_result() {
    let dir = tempfile::tempdir().unwrap();
    let (orch, registry, _) = orchestrator(OkRunner, &dir, Duration::from_secs(5));

    let id = orch.submit("hypertension guidelines");
    let events: Vec<TaskEvent> = task_events(registry.clone(), id.clone(), POLL)
        .unwrap()
        .collect()
        .await;

    // At least one log, then exactly one status, then the result, then end.
    let log_count = events
        .iter()
        .filter(|e| matches!(e, TaskEvent::Log(_)))
        .count();
    assert!(log_count >= 1);
    assert_eq!(events[0], TaskEvent::Log("Starting research crew...".to_string()));

    let status_pos = events
        .iter()
        .position(|e| matches!(e, TaskEvent::Status(_)))
        .unwrap();
    assert_eq!(events[status_pos], TaskEvent::Status(TaskStatus::Completed));
    // Every log precedes the status event.
    assert!(events[..status_pos]
        .iter()
        .all(|e| matches!(e, TaskEvent::Log(_))));
    assert!(matches!(events.last().unwrap(), TaskEvent::Result(_)));

    // The record's final state matches what the stream reported.
    assert_eq!(registry.get(&id).unwrap().status, TaskStatus::Completed);
}

#[tokio::test]
async fn stream_for_failed_task_ends_without_result() {
    let dir = tempfile::tempdir().unwrap();
    let (orch, registry, _) = orchestrator(FailRunner, &dir, Duration::from_secs(5));

    let id = orch.submit("topic");
    let events: Vec<TaskEvent> = task_events(registry, id, POLL)
        .unwrap()
        .collect()
        .await;

    assert_eq!(
        events.last().unwrap(),
        &TaskEvent::Status(TaskStatus::Failed)
    );
    assert!(!events.iter().any(|e| matches!(e, TaskEvent::Result(_))));
}

#[tokio::test]
async fn stream_logs_are_prefix_growing_and_never_replayed() {
    let registry = Arc::new(TaskRegistry::new(16));
    let id = registry.create("topic");
    registry.transition(&id, TaskStatus::Running).unwrap();
    registry.append_log(&id, "one").unwrap();

    let registry_bg = registry.clone();
    let id_bg = id.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        registry_bg.append_log(&id_bg, "two").unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        registry_bg.append_log(&id_bg, "three").unwrap();
        registry_bg
            .transition(&id_bg, TaskStatus::Completed)
            .unwrap();
    });

    let events: Vec<TaskEvent> = task_events(registry, id, POLL)
        .unwrap()
        .collect()
        .await;

    let logs: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            TaskEvent::Log(line) => Some(line.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(logs, vec!["one", "two", "three"]);
}
