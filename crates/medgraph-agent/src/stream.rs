//! Status stream — finite, non-restartable event sequence for one task
//!
//! The stream polls the registry on a fixed interval (no push): each tick
//! emits any newly appended log lines, then, once the task is terminal,
//! exactly one status event and (if present) one result event, and ends.
//! A record that vanishes mid-stream ends the stream without error.

use crate::registry::TaskRegistry;
use futures::Stream;
use medgraph_core::{Error, Result, TaskId, TaskStatus};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
pub enum TaskEvent {
    Log(String),
    Status(TaskStatus),
    Result(serde_json::Value),
}

/// Subscribe to a task's events. Fails immediately if the task id is
/// unknown, rather than producing an empty stream.
pub fn task_events(
    registry: Arc<TaskRegistry>,
    task_id: TaskId,
    poll_interval: Duration,
) -> Result<impl Stream<Item = TaskEvent>> {
    if !registry.contains(&task_id) {
        return Err(Error::TaskNotFound(task_id.to_string()));
    }

    Ok(async_stream::stream! {
        let mut cursor = 0usize;

        loop {
            let Some(record) = registry.get(&task_id) else {
                break;
            };

            // Logs first, in append order; the cursor guarantees each line
            // is emitted to this subscriber exactly once.
            for log in &record.logs[cursor..] {
                yield TaskEvent::Log(log.clone());
            }
            cursor = record.logs.len();

            if record.status.is_terminal() {
                yield TaskEvent::Status(record.status);
                if let Some(result) = record.result {
                    yield TaskEvent::Result(result);
                }
                break;
            }

            tokio::time::sleep(poll_interval).await;
        }
    })
}
