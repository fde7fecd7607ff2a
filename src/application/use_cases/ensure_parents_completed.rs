//! `ensure_parents_completed` — the parent gate, including the
//! pending-vs-executing race distinction from SPEC_FULL.md §4.6.

use crate::application::services::traversal::get_parents;
use crate::application::use_cases::maybe_add_subtask::maybe_add_subtask;
use crate::domain::entities::LifecycleState;
use crate::domain::repositories::{CoordinationStore, LockGuard, TaskConfigSource};
use crate::error::StolosError;

/// `(all_parents_completed, consume_queue, held_parent_add_locks)`.
///
/// `consume_queue` tells the caller whether it's safe to drop the child
/// from its queue while waiting (a pending-but-not-executing parent has
/// been re-queued by this call, so the child will be bubbled down once
/// the parent completes); it is `false` only when a parent is currently
/// *executing*, in which case the child must stay queued so it is not
/// lost if that execution fails.
pub fn ensure_parents_completed(
    config: &dyn TaskConfigSource,
    store: &dyn CoordinationStore,
    app: &str,
    job_id: &str,
) -> Result<(bool, bool, Vec<Box<dyn LockGuard>>), StolosError> {
    let parents = get_parents(config, app, Some(job_id), &[], &[])?;
    let mut held_locks = Vec::new();
    let mut all_completed = true;

    for (parent_app, parent_job_id, _group) in parents {
        let completed = store
            .get_state(&parent_app, &parent_job_id)
            .map(|record| record.state == LifecycleState::Completed)
            .unwrap_or(false);
        if completed {
            continue;
        }
        all_completed = false;

        if store.has_execute_lock(&parent_app, &parent_job_id) {
            // Parent is mid-run: any locks gathered so far are released
            // as `held_locks` drops, and the child must stay queued.
            return Ok((false, false, Vec::new()));
        }

        if let Some(guard) = store.try_add_lock(&parent_app, &parent_job_id) {
            maybe_add_subtask(store, &parent_app, &parent_job_id, 0);
            held_locks.push(guard);
        }
    }

    Ok((all_completed, true, held_locks))
}
