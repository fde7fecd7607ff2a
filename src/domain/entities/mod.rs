mod job_id;
mod state;
mod task_descriptor;

pub use job_id::{JobIdTemplate, ParsedJobId, DEPENDENCY_GROUP_FIELD};
pub use state::{LifecycleState, TaskRecord};
pub use task_descriptor::{
    DependencySpec, DependsOn, GroupMember, TaskDescriptor, ValidIfOr,
    DEPENDENCY_GROUP_DEFAULT_NAME,
};
