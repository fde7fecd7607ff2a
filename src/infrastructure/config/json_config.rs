//! JSON-backed `TaskConfigSource`, loaded from the path named by the
//! `TASKS_JSON` environment variable (with an optional `.env` file for
//! local development, matching the teacher's use of `dotenv` for web
//! secrets).

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};

use crate::domain::entities::TaskDescriptor;
use crate::domain::repositories::TaskConfigSource;

pub struct JsonTaskConfig {
    descriptors: HashMap<String, TaskDescriptor>,
}

impl JsonTaskConfig {
    pub fn from_str(json: &str) -> Result<Self> {
        let descriptors: HashMap<String, TaskDescriptor> =
            serde_json::from_str(json).context("parsing task config JSON")?;
        Ok(Self { descriptors })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("reading task config at {:?}", path.as_ref()))?;
        Self::from_str(&raw)
    }

    /// Loads `dotenv` first (if present), then reads the path from
    /// `TASKS_JSON`.
    pub fn from_env() -> Result<Self> {
        let _ = dotenv::dotenv();
        let path = std::env::var("TASKS_JSON").context("TASKS_JSON environment variable not set")?;
        Self::from_path(path)
    }
}

impl TaskConfigSource for JsonTaskConfig {
    fn get(&self, app: &str) -> Option<&TaskDescriptor> {
        self.descriptors.get(app)
    }

    fn apps(&self) -> Vec<&str> {
        self.descriptors.keys().map(String::as_str).collect()
    }
}
