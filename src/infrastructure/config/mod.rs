mod json_config;

pub use json_config::JsonTaskConfig;
