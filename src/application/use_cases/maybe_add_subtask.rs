//! `maybe_add_subtask` — idempotently create and enqueue a task (P1).

use crate::domain::repositories::CoordinationStore;

/// Creates the (app, job_id) state node as `Pending` if absent, then
/// enqueues it unless it is already queued. Calling this twice with the
/// same arguments has the same effect as calling it once.
pub fn maybe_add_subtask(store: &dyn CoordinationStore, app: &str, job_id: &str, priority: i64) {
    store.create_pending(app, job_id);
    if store.is_in_queue(app, job_id) {
        return;
    }
    store.enqueue(app, job_id, priority);
}
