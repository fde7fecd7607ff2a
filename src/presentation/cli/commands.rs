//! CLI command implementations for the `stolos` runner binary.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::application::services::{Dag, PredicateRegistry};
use crate::application::use_cases::{run_once, GateOutcome};
use crate::domain::entities::{JobIdTemplate, TaskDescriptor};
use crate::domain::repositories::{CoordinationStore, TaskConfigSource};
use crate::domain::value_objects::JobType;
use crate::infrastructure::plugins::{BashExecutor, PluginRegistry};

/// Overrides one app's configured retry bound for a single run, leaving the
/// rest of the underlying config untouched. Backs `--max-retry`.
struct MaxRetryOverride<'a> {
    inner: &'a dyn TaskConfigSource,
    app_name: &'a str,
    overridden: TaskDescriptor,
}

impl<'a> TaskConfigSource for MaxRetryOverride<'a> {
    fn get(&self, app: &str) -> Option<&TaskDescriptor> {
        if app == self.app_name {
            Some(&self.overridden)
        } else {
            self.inner.get(app)
        }
    }

    fn apps(&self) -> Vec<&str> {
        self.inner.apps()
    }
}

/// Implements the `stolos run` subcommand.
pub struct RunCommand;

impl RunCommand {
    #[allow(clippy::too_many_arguments)]
    pub fn execute(
        config: &dyn TaskConfigSource,
        dag: &Dag,
        store: &dyn CoordinationStore,
        app_name: &str,
        job_id: Option<&str>,
        bash: Option<&str>,
        bypass_scheduler: bool,
        max_retry: Option<u32>,
        timeout: Duration,
        redirect_to_stderr: bool,
    ) -> Result<()> {
        let base_descriptor = config
            .get(app_name)
            .with_context(|| format!("app {app_name:?} is not declared in the task config"))?
            .clone();

        let overridden;
        let config: &dyn TaskConfigSource = match max_retry {
            Some(bound) => {
                let mut overridden_descriptor = base_descriptor.clone();
                overridden_descriptor.max_retry = bound.into();
                overridden = MaxRetryOverride {
                    inner: config,
                    app_name,
                    overridden: overridden_descriptor,
                };
                &overridden
            }
            None => config,
        };
        let descriptor = config.get(app_name).expect("app was just resolved above");

        let mut plugins = PluginRegistry::new();
        if let Some(bash) = bash {
            plugins.register(
                JobType::Bash,
                Box::new(BashExecutor::new(bash).with_redirect_to_stderr(redirect_to_stderr)),
            );
        }
        let predicates = PredicateRegistry::new();

        if bypass_scheduler {
            let job_id = job_id
                .context("--bypass-scheduler requires --job-id")?;
            let parsed = match &descriptor.job_id {
                Some(template) => JobIdTemplate::compile(template)?.parse(job_id)?,
                None => Default::default(),
            };
            plugins
                .dispatch(&descriptor.job_type, app_name, job_id, &parsed)
                .with_context(|| format!("bypass-scheduler run of {app_name}/{job_id} failed"))?;
            info!(app = app_name, job_id, "completed via bypass-scheduler");
            return Ok(());
        }

        if let Some(job_id) = job_id {
            if !store.is_in_queue(app_name, job_id) {
                warn!(
                    app = app_name,
                    job_id,
                    "will not execute this task because it might be already queued or completed"
                );
                return Ok(());
            }
            let outcome = run_once(dag, config, store, &plugins, &predicates, app_name, timeout)
                .with_context(|| format!("running {app_name}/{job_id}"))?;
            Self::report(app_name, outcome);
            if outcome == GateOutcome::Failed {
                bail!("{app_name}/{job_id} failed permanently");
            }
            return Ok(());
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}").expect("static template is valid"),
        );
        let mut processed = 0u64;
        loop {
            let outcome = run_once(dag, config, store, &plugins, &predicates, app_name, timeout)
                .with_context(|| format!("running the executor gate for {app_name}"))?;
            if outcome == GateOutcome::QueueEmpty {
                spinner.finish_with_message(format!("{app_name}: queue drained, {processed} task(s) processed"));
                info!(app = app_name, "queue drained, exiting");
                break;
            }
            processed += 1;
            spinner.set_message(format!("{app_name}: {processed} task(s) processed, last outcome {outcome:?}"));
            spinner.tick();
            Self::report(app_name, outcome);
        }
        Ok(())
    }

    fn report(app_name: &str, outcome: GateOutcome) {
        match outcome {
            GateOutcome::Completed => info!(app = app_name, "task completed"),
            GateOutcome::Retrying => warn!(app = app_name, "task failed, retrying"),
            GateOutcome::Failed => warn!(app = app_name, "task retried too many times and is permanently failed"),
            GateOutcome::Skipped => info!(app = app_name, "task skipped by valid_if_or"),
            GateOutcome::WaitingOnParents => info!(app = app_name, "waiting on incomplete parents"),
            GateOutcome::LockContention => info!(app = app_name, "execute lock contended, requeued"),
            GateOutcome::InvalidJobId => warn!(app = app_name, "dequeued job id did not match its template"),
            GateOutcome::QueueEmpty => {}
        }
    }
}
