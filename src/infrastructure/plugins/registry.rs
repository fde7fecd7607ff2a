//! Tagged plugin dispatch keyed by `JobType` (SPEC_FULL.md §9).

use std::collections::HashMap;

use crate::domain::entities::ParsedJobId;
use crate::domain::value_objects::JobType;
use crate::error::StolosError;

pub trait PluginExecutor: Send + Sync {
    fn execute(&self, app: &str, job_id: &str, parsed: &ParsedJobId) -> Result<(), StolosError>;
}

#[derive(Default)]
pub struct PluginRegistry {
    executors: HashMap<JobType, Box<dyn PluginExecutor>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, job_type: JobType, executor: Box<dyn PluginExecutor>) {
        self.executors.insert(job_type, executor);
    }

    pub fn dispatch(&self, job_type: &JobType, app: &str, job_id: &str, parsed: &ParsedJobId) -> Result<(), StolosError> {
        let executor = self.executors.get(job_type).ok_or_else(|| StolosError::PluginFailure {
            app: app.to_string(),
            job_id: job_id.to_string(),
            source: anyhow::anyhow!("no plugin executor registered for job type {job_type}"),
        })?;
        executor.execute(app, job_id, parsed)
    }
}
