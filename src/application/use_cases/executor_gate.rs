//! The executor gate: the full dequeue-validate-lock-execute-finalize
//! sequence described in SPEC_FULL.md §4.6/§4.7.

use std::time::Duration;

use crate::application::services::dag_builder::Dag;
use crate::application::services::validator::{self, PredicateRegistry};
use crate::application::use_cases::ensure_parents_completed::ensure_parents_completed;
use crate::application::use_cases::maybe_queue_children::maybe_queue_children;
use crate::domain::entities::{JobIdTemplate, LifecycleState, ParsedJobId};
use crate::domain::repositories::{CoordinationStore, TaskConfigSource};
use crate::error::StolosError;
use crate::infrastructure::plugins::PluginRegistry;

/// What happened to the single task instance this call processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    QueueEmpty,
    InvalidJobId,
    LockContention,
    Skipped,
    WaitingOnParents,
    Completed,
    Retrying,
    Failed,
}

/// Runs one iteration of the gate for `app`, blocking up to `timeout` to
/// dequeue an item. Every branch releases the execute lock on return
/// (it's a block-scoped guard, dropped at the end of this function).
pub fn run_once(
    dag: &Dag,
    config: &dyn TaskConfigSource,
    store: &dyn CoordinationStore,
    plugins: &PluginRegistry,
    predicates: &PredicateRegistry,
    app: &str,
    timeout: Duration,
) -> Result<GateOutcome, StolosError> {
    let Some(job_id) = store.dequeue(app, timeout) else {
        return Ok(GateOutcome::QueueEmpty);
    };

    let descriptor = config
        .get(app)
        .ok_or_else(|| StolosError::DagMisconfigured(format!("app {app:?} has no task descriptor")))?;

    let template = descriptor.job_id.as_deref().map(JobIdTemplate::compile).transpose()?;
    let parsed = match &template {
        Some(template) => match template.parse(&job_id) {
            Ok(parsed) => parsed,
            Err(_) => {
                // Recoverable here, unlike a parse failure during
                // traversal: mark it failed and drop it rather than
                // propagating (spec §7).
                store.set_state(app, &job_id, LifecycleState::Failed);
                store.remove_from_queue(app, &job_id);
                return Ok(GateOutcome::InvalidJobId);
            }
        },
        None => ParsedJobId::new(),
    };

    let Some(_execute_lock) = store.try_execute_lock(app, &job_id) else {
        store.requeue_front(app, &job_id);
        return Ok(GateOutcome::LockContention);
    };

    if !validator::passes(descriptor.valid_if_or.as_ref(), &parsed, predicates) {
        store.set_state(app, &job_id, LifecycleState::Skipped);
        store.remove_from_queue(app, &job_id);
        maybe_queue_children(dag, config, store, app, &job_id)?;
        return Ok(GateOutcome::Skipped);
    }

    let (all_parents_completed, consume_queue, _parent_locks) =
        ensure_parents_completed(config, store, app, &job_id)?;
    if !all_parents_completed {
        if consume_queue {
            store.remove_from_queue(app, &job_id);
        } else {
            // A parent is currently executing rather than merely pending:
            // `dequeue` already popped this entry, so it must go back or
            // it's lost for good once the parent completes and finds
            // `in_queue` still true (spec §5 race).
            store.requeue_front(app, &job_id);
        }
        return Ok(GateOutcome::WaitingOnParents);
    }

    match plugins.dispatch(&descriptor.job_type, app, &job_id, &parsed) {
        Ok(()) => {
            store.set_state(app, &job_id, LifecycleState::Completed);
            store.remove_from_queue(app, &job_id);
            maybe_queue_children(dag, config, store, app, &job_id)?;
            Ok(GateOutcome::Completed)
        }
        Err(_) => {
            let retry_count = store.get_state(app, &job_id).map(|r| r.retry_count).unwrap_or(0) + 1;
            store.set_retry_count(app, &job_id, retry_count);
            if descriptor.max_retry.exhausted(retry_count) {
                store.set_state(app, &job_id, LifecycleState::Failed);
                store.remove_from_queue(app, &job_id);
                Ok(GateOutcome::Failed)
            } else {
                // Cycles to the back of the queue rather than staying at
                // the front, matching the original's retry behavior.
                store.enqueue(app, &job_id, 0);
                Ok(GateOutcome::Retrying)
            }
        }
    }
}
