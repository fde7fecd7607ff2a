pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod presentation;

pub use application::{services, use_cases};
pub use domain::{entities, repositories, value_objects};
pub use error::StolosError;
pub use infrastructure::{config, plugins, store};
