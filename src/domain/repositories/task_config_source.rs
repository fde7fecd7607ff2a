//! `TaskConfigSource`: the abstraction over wherever the task config
//! document lives. `infrastructure::config::JsonTaskConfig` is the only
//! in-tree implementation; mirrors the `JobRepository` trait boundary the
//! teacher uses for its in-memory job store.

use crate::domain::entities::TaskDescriptor;

#[cfg_attr(test, mockall::automock)]
pub trait TaskConfigSource: Send + Sync {
    fn get(&self, app: &str) -> Option<&TaskDescriptor>;
    fn apps(&self) -> Vec<&str>;
}
