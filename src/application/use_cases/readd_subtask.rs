//! `readd_subtask` — force a task back to `Pending` and cascade the
//! invalidation to its already-completed descendants (SPEC_FULL.md §4.6,
//! P7).

use std::collections::HashSet;

use crate::application::services::dag_builder::Dag;
use crate::application::services::traversal::get_children;
use crate::domain::entities::LifecycleState;
use crate::domain::repositories::{CoordinationStore, TaskConfigSource};
use crate::error::StolosError;

/// Resets `(app, job_id)` to `Pending` and re-enqueues it. Every
/// `Completed` descendant reachable through `get_children` is reset to
/// `Pending` too (but NOT re-enqueued — it waits to be bubbled down again
/// once its own parents re-complete). Descendants currently executing
/// (holding an execute lock) are left alone; SPEC_FULL.md §9 Open
/// Question 3 documents this as an intentional, eventually-consistent
/// race rather than something this call serializes against.
pub fn readd_subtask(
    dag: &Dag,
    config: &dyn TaskConfigSource,
    store: &dyn CoordinationStore,
    app: &str,
    job_id: &str,
) -> Result<(), StolosError> {
    let already_pending_and_queued = store
        .get_state(app, job_id)
        .map(|record| record.in_queue && record.state == LifecycleState::Pending)
        .unwrap_or(false);
    if already_pending_and_queued {
        return Err(StolosError::JobAlreadyQueued { app: app.to_string(), job_id: job_id.to_string() });
    }

    store.set_state(app, job_id, LifecycleState::Pending);
    store.set_retry_count(app, job_id, 0);
    store.enqueue(app, job_id, 0);

    let mut visited = HashSet::new();
    visited.insert((app.to_string(), job_id.to_string()));
    invalidate_completed_descendants(dag, config, store, app, job_id, &mut visited)?;
    Ok(())
}

fn invalidate_completed_descendants(
    dag: &Dag,
    config: &dyn TaskConfigSource,
    store: &dyn CoordinationStore,
    app: &str,
    job_id: &str,
    visited: &mut HashSet<(String, String)>,
) -> Result<(), StolosError> {
    for (child_app, child_job_id, _group) in get_children(dag, config, app, job_id)? {
        let key = (child_app.clone(), child_job_id.clone());
        if !visited.insert(key) {
            continue;
        }
        if store.has_execute_lock(&child_app, &child_job_id) {
            continue;
        }
        let is_completed = store
            .get_state(&child_app, &child_job_id)
            .map(|record| record.state == LifecycleState::Completed)
            .unwrap_or(false);
        if is_completed {
            store.set_state(&child_app, &child_job_id, LifecycleState::Pending);
            store.set_in_queue(&child_app, &child_job_id, false);
        }
        invalidate_completed_descendants(dag, config, store, &child_app, &child_job_id, visited)?;
    }
    Ok(())
}
