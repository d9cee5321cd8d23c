pub mod common;
pub mod config;
pub mod coordinator;
pub mod database;
pub mod errors;
pub mod export_status;
pub mod health;
pub mod lease;
pub mod logging;
pub mod pipeline;
pub mod scheduler;
pub mod services;

pub use config::CoordinatorConfig;
pub use coordinator::{Collaborators, InvocationOutcome, PipelineWorker};
