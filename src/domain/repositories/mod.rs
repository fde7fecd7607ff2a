mod coordination_store;
mod task_config_source;

pub use coordination_store::{CoordinationStore, LockGuard};
pub use task_config_source::TaskConfigSource;
#[cfg(test)]
pub use task_config_source::MockTaskConfigSource;
