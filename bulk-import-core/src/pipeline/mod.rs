pub mod registry;
pub mod types;

pub use registry::PipelineRegistry;
pub use types::{Pipeline, PipelineContext, PipelineOutcome};
