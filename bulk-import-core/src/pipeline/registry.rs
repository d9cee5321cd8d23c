use std::collections::HashMap;
use std::sync::Arc;

use super::types::Pipeline;
use crate::errors::{CoordinatorError, CoordinatorResult};

/// Maps the pipeline name stored on a tracker to its implementation
#[derive(Clone, Default)]
pub struct PipelineRegistry {
    pipelines: HashMap<String, Arc<dyn Pipeline>>,
}

impl PipelineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pipeline, replacing any previous one with the same name
    pub fn register(&mut self, pipeline: Arc<dyn Pipeline>) -> &mut Self {
        self.pipelines.insert(pipeline.name().to_string(), pipeline);
        self
    }

    pub fn with(mut self, pipeline: Arc<dyn Pipeline>) -> Self {
        self.register(pipeline);
        self
    }

    pub fn get(&self, name: &str) -> CoordinatorResult<Arc<dyn Pipeline>> {
        self.pipelines
            .get(name)
            .cloned()
            .ok_or_else(|| CoordinatorError::UnknownPipeline(name.to_string()))
    }
}
