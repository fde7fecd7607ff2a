//! Task configuration entities: the shapes a task config document can
//! declare for a single app, mirroring the JSON layout in the external
//! interface.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{JobType, RetryPolicy};

/// A single parent/child constraint: which apps satisfy this edge and
/// (optionally) which job-id field values are required to match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencySpec {
    pub app_name: Vec<String>,
    #[serde(default)]
    pub job_id: Option<Vec<String>>,
    #[serde(flatten)]
    pub fields: HashMap<String, Vec<String>>,
}

impl DependencySpec {
    /// True if this spec declares nothing beyond `app_name` — the
    /// "inherit the parent's job id unchanged" shape.
    pub fn is_inherit_only(&self) -> bool {
        self.job_id.is_none() && self.fields.is_empty()
    }
}

/// One dependency group's membership: either a single spec, or a list of
/// subgroups that must ALL match (see DESIGN.md Open Question 1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupMember {
    Single(DependencySpec),
    Subgroups(Vec<DependencySpec>),
}

/// The `depends_on` shape for an app: either a bare spec (the implicit
/// default group) or a named mapping of groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependsOn {
    Bare(DependencySpec),
    Groups(IndexMap<String, GroupMember>),
}

/// Name Stolos gives the implicit group when `depends_on` is a bare spec.
pub const DEPENDENCY_GROUP_DEFAULT_NAME: &str = "default";

/// Acceptance filter evaluated before a task is executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidIfOr {
    #[serde(default)]
    pub fields: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub func: Option<String>,
}

/// Full declaration of one app in the task config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub job_type: JobType,
    #[serde(default)]
    pub depends_on: Option<DependsOn>,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub valid_if_or: Option<ValidIfOr>,
    #[serde(default)]
    pub autofill: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub max_retry: RetryPolicy,
}
