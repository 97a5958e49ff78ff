//! Task orchestrator — schedules workflows off the request-handling path
//!
//! submit() creates the record and returns immediately; the workflow runs
//! in a spawned task. Per-task side effects are strictly sequential: log
//! append, then state transition, then persistence write, so a reader
//! polling logs never observes a terminal status before its logs.
//!
//! No retries: a failed run is terminal and must be resubmitted as a new
//! task. The only bound on a run is the configured timeout.

use crate::registry::TaskRegistry;
use crate::runner::AgentRunner;
use medgraph_core::{TaskId, TaskStatus};
use medgraph_store::ObjectStore;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Clone)]
pub struct Orchestrator {
    registry: Arc<TaskRegistry>,
    runner: Arc<dyn AgentRunner>,
    objects: Arc<ObjectStore>,
    timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<TaskRegistry>,
        runner: Arc<dyn AgentRunner>,
        objects: Arc<ObjectStore>,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            runner,
            objects,
            timeout,
        }
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    /// Create the task record and schedule the workflow. Returns the fresh
    /// id without waiting on agent execution.
    pub fn submit(&self, topic: &str) -> TaskId {
        let task_id = self.registry.create(topic);

        let this = self.clone();
        let id = task_id.clone();
        let topic = topic.to_string();
        tokio::spawn(async move {
            this.execute(id, topic).await;
        });

        task_id
    }

    async fn execute(&self, task_id: TaskId, topic: String) {
        info!("Starting task {} for topic: {}", task_id, topic);

        if let Err(e) = self
            .registry
            .append_log(&task_id, "Starting research crew...")
        {
            error!("Task {} disappeared before start: {}", task_id, e);
            return;
        }
        if let Err(e) = self.registry.transition(&task_id, TaskStatus::Running) {
            error!("Task {} could not start: {}", task_id, e);
            return;
        }

        match tokio::time::timeout(self.timeout, self.runner.run(&task_id, &topic)).await {
            Ok(Ok(result)) => self.complete(&task_id, &topic, result).await,
            Ok(Err(e)) => {
                error!("Task {} failed: {}", task_id, e);
                self.fail(&task_id, &e.to_string());
            }
            Err(_) => {
                error!("Task {} timed out after {:?}", task_id, self.timeout);
                self.fail(
                    &task_id,
                    &format!("workflow timed out after {}s", self.timeout.as_secs()),
                );
            }
        }
    }

    async fn complete(&self, task_id: &TaskId, topic: &str, result: String) {
        // Result and success log land before the terminal transition.
        let _ = self
            .registry
            .set_result(task_id, json!({ "output": result }));
        let _ = self
            .registry
            .append_log(task_id, "Research completed successfully.");
        if let Err(e) = self.registry.transition(task_id, TaskStatus::Completed) {
            error!("Task {} completion rejected: {}", task_id, e);
            return;
        }

        let mut metadata = HashMap::new();
        metadata.insert("task_id".to_string(), task_id.to_string());
        metadata.insert("topic".to_string(), topic.to_string());
        if let Err(e) = self
            .objects
            .put(format!("{}_final", task_id), result, metadata)
            .await
        {
            // The task is already completed; losing the evidence copy is
            // logged, not surfaced.
            error!("Object store write failed for task {}: {}", task_id, e);
        }
    }

    fn fail(&self, task_id: &TaskId, reason: &str) {
        let _ = self
            .registry
            .append_log(task_id, format!("Error: {}", reason));
        if let Err(e) = self.registry.transition(task_id, TaskStatus::Failed) {
            error!("Task {} failure transition rejected: {}", task_id, e);
        }
    }
}
