//! `maybe_queue_children` — bubble a completed task's readiness down to
//! its children (SPEC_FULL.md §4.6).

use crate::application::services::dag_builder::Dag;
use crate::application::services::traversal::{get_children, get_parents};
use crate::application::use_cases::maybe_add_subtask::maybe_add_subtask;
use crate::domain::entities::LifecycleState;
use crate::domain::repositories::{CoordinationStore, TaskConfigSource};
use crate::error::StolosError;

/// Queues every child of `(app, job_id)` whose own parents are now all
/// `Completed`.
pub fn maybe_queue_children(
    dag: &Dag,
    config: &dyn TaskConfigSource,
    store: &dyn CoordinationStore,
    app: &str,
    job_id: &str,
) -> Result<(), StolosError> {
    for (child_app, child_job_id, _group) in get_children(dag, config, app, job_id)? {
        let parents = get_parents(config, &child_app, Some(&child_job_id), &[], &[])?;
        let all_completed = parents.iter().all(|(parent_app, parent_job_id, _)| {
            store
                .get_state(parent_app, parent_job_id)
                .map(|record| record.state == LifecycleState::Completed)
                .unwrap_or(false)
        });
        if all_completed {
            maybe_add_subtask(store, &child_app, &child_job_id, 0);
        }
    }
    Ok(())
}
