//! Plugin dispatch tag (see SPEC_FULL.md §9 design note on plugin
//! dispatch as a tagged registry).

use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

/// Identifies which `PluginExecutor` runs a task. `spark`/`python` are
/// recognized so config documents that name them round-trip, even though
/// only `bash` has an in-tree executor (spec §1: other plugin executors
/// are external collaborators). Any other string is carried as `Custom`
/// so the registry can report a clean `PluginFailure` instead of a
/// deserialization error.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JobType {
    Bash,
    Spark,
    Python,
    Custom(String),
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobType::Bash => write!(f, "bash"),
            JobType::Spark => write!(f, "spark"),
            JobType::Python => write!(f, "python"),
            JobType::Custom(name) => write!(f, "{name}"),
        }
    }
}

impl From<&str> for JobType {
    fn from(value: &str) -> Self {
        match value {
            "bash" => JobType::Bash,
            "spark" => JobType::Spark,
            "python" => JobType::Python,
            other => JobType::Custom(other.to_string()),
        }
    }
}

impl Serialize for JobType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for JobType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw.is_empty() {
            return Err(D::Error::custom("job_type must not be empty"));
        }
        Ok(JobType::from(raw.as_str()))
    }
}
