//! Task registry — the in-memory task table and its state machine
//!
//! The registry owns every TaskRecord. Other components read snapshots;
//! only the orchestrator driving a task mutates it, so there is one writer
//! per task id by construction. Logs are append-only and transitions are
//! monotonic: pending -> running -> {completed, failed}.

use dashmap::DashMap;
use medgraph_core::{Error, Result, TaskId, TaskRecord, TaskStatus};
use tracing::{info, warn};

pub struct TaskRegistry {
    tasks: DashMap<TaskId, TaskRecord>,
    capacity: usize,
}

impl TaskRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            tasks: DashMap::new(),
            capacity,
        }
    }

    /// Create a task record with a fresh id and pending status.
    ///
    /// The table is capacity-bounded: at capacity the oldest terminal
    /// record is evicted first. If every record is still live the table
    /// grows past the bound rather than dropping in-flight work.
    pub fn create(&self, topic: impl Into<String>) -> TaskId {
        if self.tasks.len() >= self.capacity {
            self.evict_oldest_terminal();
        }

        let task_id = TaskId::generate();
        let record = TaskRecord::new(task_id.clone(), topic);
        self.tasks.insert(task_id.clone(), record);
        task_id
    }

    /// Append a log line. Logs are never reordered or truncated.
    pub fn append_log(&self, task_id: &TaskId, message: impl Into<String>) -> Result<()> {
        let mut record = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
        record.logs.push(message.into());
        Ok(())
    }

    /// Transition the task, enforcing the monotonic ordering invariant.
    /// An out-of-order transition is a logic error and is rejected.
    pub fn transition(&self, task_id: &TaskId, next: TaskStatus) -> Result<()> {
        let mut record = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;

        if !record.status.can_transition_to(next) {
            return Err(Error::invalid_transition(
                record.status.as_str(),
                next.as_str(),
            ));
        }

        info!("Task {}: {} -> {}", task_id, record.status, next);
        record.status = next;
        Ok(())
    }

    /// Attach the result payload. Only meaningful right before the task
    /// reaches a terminal state.
    pub fn set_result(&self, task_id: &TaskId, result: serde_json::Value) -> Result<()> {
        let mut record = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
        record.result = Some(result);
        Ok(())
    }

    /// Point-in-time snapshot of a record.
    pub fn get(&self, task_id: &TaskId) -> Option<TaskRecord> {
        self.tasks.get(task_id).map(|r| r.clone())
    }

    pub fn contains(&self, task_id: &TaskId) -> bool {
        self.tasks.contains_key(task_id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn evict_oldest_terminal(&self) {
        let oldest = self
            .tasks
            .iter()
            .filter(|r| r.status.is_terminal())
            .min_by_key(|r| r.created_at)
            .map(|r| r.task_id.clone());

        match oldest {
            Some(task_id) => {
                info!("Task table at capacity; evicting terminal task {}", task_id);
                self.tasks.remove(&task_id);
            }
            None => {
                warn!(
                    "Task table over capacity ({}) with no terminal tasks to evict",
                    self.capacity
                );
            }
        }
    }
}
