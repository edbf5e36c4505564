//! HTTP API handlers for eloquent-tts

pub mod health;
pub mod jobs;

pub use health::{get_build_info, health_check, health_routes};
pub use jobs::{job_routes, run_job};
