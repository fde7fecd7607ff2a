//! The only plugin executor shipped in-tree; backs the CLI's `--bash`
//! flag and integration tests. Spark/Python/custom executors are
//! external collaborators (spec §1).

use std::process::{Command, Stdio};

use crate::domain::entities::ParsedJobId;
use crate::error::StolosError;

use super::registry::PluginExecutor;

pub struct BashExecutor {
    command_template: String,
    redirect_to_stderr: bool,
}

impl BashExecutor {
    pub fn new(command_template: impl Into<String>) -> Self {
        Self { command_template: command_template.into(), redirect_to_stderr: false }
    }

    /// Merges the child's stdout into this process's stderr, matching the
    /// `--redirect-to-stderr` CLI flag (useful when a surrounding supervisor
    /// only captures one stream).
    pub fn with_redirect_to_stderr(mut self, redirect_to_stderr: bool) -> Self {
        self.redirect_to_stderr = redirect_to_stderr;
        self
    }
}

impl PluginExecutor for BashExecutor {
    fn execute(&self, app: &str, job_id: &str, parsed: &ParsedJobId) -> Result<(), StolosError> {
        let mut command = self.command_template.clone();
        for (field, value) in parsed {
            command = command.replace(&format!("{{{field}}}"), value);
        }
        let mut cmd = Command::new("bash");
        cmd.arg("-c").arg(&command);
        if self.redirect_to_stderr {
            cmd.stdout(Stdio::from(std::io::stderr()));
        }
        let status = cmd
            .status()
            .map_err(|err| StolosError::PluginFailure {
                app: app.to_string(),
                job_id: job_id.to_string(),
                source: anyhow::Error::new(err),
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(StolosError::PluginFailure {
                app: app.to_string(),
                job_id: job_id.to_string(),
                source: anyhow::anyhow!("bash exited with status {status}"),
            })
        }
    }
}
