//! In-memory `CoordinationStore`. Exercises the whole state machine in
//! tests and a single-process CLI without a real ZooKeeper client (which
//! this crate does not implement — see SPEC_FULL.md §1).
//!
//! Generalizes the teacher's `InMemoryJobRepository` (a `HashMap`-backed
//! trait implementation) to add locking and a priority queue, neither of
//! which the teacher's flat job store needed.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::domain::entities::{LifecycleState, TaskRecord};
use crate::domain::repositories::{CoordinationStore, LockGuard};

#[derive(Debug, Eq, PartialEq)]
struct QueueEntry {
    priority: i64,
    sequence: u64,
    job_id: String,
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so the lowest priority (and,
        // within a priority, the lowest sequence number) pops first.
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct Inner {
    records: HashMap<(String, String), TaskRecord>,
    queues: HashMap<String, BinaryHeap<QueueEntry>>,
    add_locks: HashSet<(String, String)>,
    execute_locks: HashSet<(String, String)>,
    sequence: u64,
}

impl Inner {
    fn new() -> Self {
        Self {
            records: HashMap::new(),
            queues: HashMap::new(),
            add_locks: HashSet::new(),
            execute_locks: HashSet::new(),
            sequence: 0,
        }
    }
}

pub struct InMemoryCoordinationStore {
    inner: Arc<Mutex<Inner>>,
    dequeued: Condvar,
}

impl InMemoryCoordinationStore {
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(Inner::new())), dequeued: Condvar::new() }
    }

    /// Bypasses all validation to inject an arbitrary state directly —
    /// used by tests that exercise the executor's `InvalidJobId`-at-dequeue
    /// path, mirroring `_set_state_unsafe` in the original test suite.
    pub fn set_state_unsafe(&self, app: &str, job_id: &str, state: LifecycleState, in_queue: bool) {
        let mut inner = self.inner.lock();
        let record = inner
            .records
            .entry((app.to_string(), job_id.to_string()))
            .or_insert_with(TaskRecord::new_pending);
        record.state = state;
        record.in_queue = in_queue;
    }
}

impl Default for InMemoryCoordinationStore {
    fn default() -> Self {
        Self::new()
    }
}

struct SetLockGuard {
    inner: Arc<Mutex<Inner>>,
    key: (String, String),
    execute: bool,
}

impl LockGuard for SetLockGuard {}

impl Drop for SetLockGuard {
    fn drop(&mut self) {
        let mut inner = self.inner.lock();
        if self.execute {
            inner.execute_locks.remove(&self.key);
        } else {
            inner.add_locks.remove(&self.key);
        }
    }
}

impl CoordinationStore for InMemoryCoordinationStore {
    fn get_state(&self, app: &str, job_id: &str) -> Option<TaskRecord> {
        self.inner.lock().records.get(&(app.to_string(), job_id.to_string())).cloned()
    }

    fn create_pending(&self, app: &str, job_id: &str) -> bool {
        let mut inner = self.inner.lock();
        let key = (app.to_string(), job_id.to_string());
        if inner.records.contains_key(&key) {
            false
        } else {
            inner.records.insert(key, TaskRecord::new_pending());
            true
        }
    }

    fn set_state(&self, app: &str, job_id: &str, state: LifecycleState) {
        let mut inner = self.inner.lock();
        inner
            .records
            .entry((app.to_string(), job_id.to_string()))
            .or_insert_with(TaskRecord::new_pending)
            .state = state;
    }

    fn set_retry_count(&self, app: &str, job_id: &str, count: u32) {
        let mut inner = self.inner.lock();
        inner
            .records
            .entry((app.to_string(), job_id.to_string()))
            .or_insert_with(TaskRecord::new_pending)
            .retry_count = count;
    }

    fn is_in_queue(&self, app: &str, job_id: &str) -> bool {
        self.inner
            .lock()
            .records
            .get(&(app.to_string(), job_id.to_string()))
            .map(|r| r.in_queue)
            .unwrap_or(false)
    }

    fn set_in_queue(&self, app: &str, job_id: &str, in_queue: bool) {
        let mut inner = self.inner.lock();
        inner
            .records
            .entry((app.to_string(), job_id.to_string()))
            .or_insert_with(TaskRecord::new_pending)
            .in_queue = in_queue;
    }

    fn enqueue(&self, app: &str, job_id: &str, priority: i64) {
        let mut inner = self.inner.lock();
        inner.sequence += 1;
        let sequence = inner.sequence;
        inner
            .queues
            .entry(app.to_string())
            .or_default()
            .push(QueueEntry { priority, sequence, job_id: job_id.to_string() });
        inner
            .records
            .entry((app.to_string(), job_id.to_string()))
            .or_insert_with(TaskRecord::new_pending)
            .in_queue = true;
        self.dequeued.notify_all();
    }

    fn dequeue(&self, app: &str, timeout: Duration) -> Option<String> {
        let mut inner = self.inner.lock();
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(queue) = inner.queues.get_mut(app) {
                if let Some(entry) = queue.pop() {
                    return Some(entry.job_id);
                }
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            let result = self.dequeued.wait_for(&mut inner, remaining);
            if result.timed_out() {
                return None;
            }
        }
    }

    fn requeue_front(&self, app: &str, job_id: &str) {
        let mut inner = self.inner.lock();
        // "Front" here means the lowest sequence number currently held,
        // so a worker that can't yet handle the item doesn't starve it
        // behind newly enqueued work.
        let sequence = inner
            .queues
            .get(app)
            .and_then(|q| q.iter().map(|e| e.sequence).min())
            .map(|min| min.saturating_sub(1))
            .unwrap_or(0);
        inner
            .queues
            .entry(app.to_string())
            .or_default()
            .push(QueueEntry { priority: i64::MIN, sequence, job_id: job_id.to_string() });
        self.dequeued.notify_all();
    }

    fn remove_from_queue(&self, app: &str, job_id: &str) {
        let mut inner = self.inner.lock();
        if let Some(queue) = inner.queues.get_mut(app) {
            let retained: Vec<QueueEntry> = queue.drain().filter(|e| e.job_id != job_id).collect();
            *queue = retained.into_iter().collect();
        }
        inner
            .records
            .entry((app.to_string(), job_id.to_string()))
            .or_insert_with(TaskRecord::new_pending)
            .in_queue = false;
    }

    fn queue_len(&self, app: &str) -> usize {
        self.inner.lock().queues.get(app).map(BinaryHeap::len).unwrap_or(0)
    }

    fn try_add_lock(&self, app: &str, job_id: &str) -> Option<Box<dyn LockGuard>> {
        let mut inner = self.inner.lock();
        let key = (app.to_string(), job_id.to_string());
        if inner.add_locks.insert(key.clone()) {
            Some(Box::new(SetLockGuard { inner: Arc::clone(&self.inner), key, execute: false }))
        } else {
            None
        }
    }

    fn try_execute_lock(&self, app: &str, job_id: &str) -> Option<Box<dyn LockGuard>> {
        let mut inner = self.inner.lock();
        let key = (app.to_string(), job_id.to_string());
        if inner.execute_locks.insert(key.clone()) {
            Some(Box::new(SetLockGuard { inner: Arc::clone(&self.inner), key, execute: true }))
        } else {
            None
        }
    }

    fn has_execute_lock(&self, app: &str, job_id: &str) -> bool {
        self.inner.lock().execute_locks.contains(&(app.to_string(), job_id.to_string()))
    }
}
