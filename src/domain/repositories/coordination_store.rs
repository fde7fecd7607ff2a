//! The `CoordinationStore` trait: the abstraction a real linearizable
//! backing store (ZooKeeper or otherwise) must satisfy. This crate ships
//! only an in-memory implementation (`infrastructure::store`); a real ZK
//! client is an external collaborator (spec §1).

use std::time::Duration;

use crate::domain::entities::{LifecycleState, TaskRecord};

/// RAII handle for an ephemeral lock. Dropping it releases the lock
/// unconditionally, so a panic or early return can never leak one.
pub trait LockGuard: Send {}

/// Coordination state for every (app, job id) pair plus the per-app
/// priority queues and ephemeral locks layered on top of it.
///
/// Path-shape contract (mirrored by the in-memory implementation for
/// debuggability): `<app>/all_subtasks/<job_id>` holds the state node,
/// `<app>/locks/add/<job_id>` and `<app>/locks/execute/<job_id>` hold the
/// ephemeral lock nodes, `<app>/queue` holds the FIFO-with-priority queue.
pub trait CoordinationStore: Send + Sync {
    /// Current state snapshot, or `None` if this (app, job_id) has never
    /// been touched.
    fn get_state(&self, app: &str, job_id: &str) -> Option<TaskRecord>;

    /// Creates a fresh `Pending` record if one does not already exist.
    /// Returns `true` if a new record was created, `false` if one already
    /// existed (idempotent no-op).
    fn create_pending(&self, app: &str, job_id: &str) -> bool;

    fn set_state(&self, app: &str, job_id: &str, state: LifecycleState);

    fn set_retry_count(&self, app: &str, job_id: &str, count: u32);

    fn is_in_queue(&self, app: &str, job_id: &str) -> bool;

    fn set_in_queue(&self, app: &str, job_id: &str, in_queue: bool);

    /// Enqueues (or re-enqueues) `job_id`; lower `priority` values are
    /// dequeued first, ties broken FIFO.
    fn enqueue(&self, app: &str, job_id: &str, priority: i64);

    /// Blocks up to `timeout` for an item to become available, then pops
    /// and returns it. `None` on timeout.
    fn dequeue(&self, app: &str, timeout: Duration) -> Option<String>;

    /// Puts an already-dequeued item back without marking it consumed —
    /// used when lock contention means this worker can't handle it now.
    fn requeue_front(&self, app: &str, job_id: &str);

    fn remove_from_queue(&self, app: &str, job_id: &str);

    fn queue_len(&self, app: &str) -> usize;

    /// Non-blocking, try-once acquisition of the add-lock.
    fn try_add_lock(&self, app: &str, job_id: &str) -> Option<Box<dyn LockGuard>>;

    /// Non-blocking, try-once acquisition of the execute-lock.
    fn try_execute_lock(&self, app: &str, job_id: &str) -> Option<Box<dyn LockGuard>>;

    fn has_execute_lock(&self, app: &str, job_id: &str) -> bool;
}
