//! Per-(app, job id) lifecycle state tracked by a `CoordinationStore`.

use serde::{Deserialize, Serialize};

/// The lifecycle of a single task instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    Pending,
    Completed,
    Failed,
    Skipped,
}

/// Snapshot of a task's coordination record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    pub state: LifecycleState,
    pub in_queue: bool,
    pub retry_count: u32,
}

impl TaskRecord {
    pub fn new_pending() -> Self {
        Self {
            state: LifecycleState::Pending,
            in_queue: false,
            retry_count: 0,
        }
    }
}

impl Default for TaskRecord {
    fn default() -> Self {
        Self::new_pending()
    }
}
