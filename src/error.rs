//! Typed domain errors, mirroring the taxonomy in SPEC_FULL.md §7. The
//! CLI layer wraps these in `anyhow::Result` with `.context(...)`, the
//! same way `AnalyzeCommand::execute` reports failures in the teacher.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StolosError {
    #[error("DAG misconfigured: {0}")]
    DagMisconfigured(String),

    #[error("invalid job id {job_id:?} for app {app:?}: {reason}")]
    InvalidJobId { app: String, job_id: String, reason: String },

    #[error("job {app}/{job_id} is already queued")]
    JobAlreadyQueued { app: String, job_id: String },

    #[error("plugin execution failed for {app}/{job_id}: {source}")]
    PluginFailure { app: String, job_id: String, source: anyhow::Error },
}
