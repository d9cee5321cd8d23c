use std::time::Duration;

use async_trait::async_trait;

use crate::database::entities::{bulk_import_entities, pipeline_trackers};

/// Everything a pipeline transformation needs to run one attempt
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub tracker: pipeline_trackers::Model,
    pub entity: bulk_import_entities::Model,
    /// Scheduling-run identifier of the invocation running the pipeline
    pub jid: String,
}

impl PipelineContext {
    pub fn new(
        tracker: pipeline_trackers::Model,
        entity: bulk_import_entities::Model,
        jid: impl Into<String>,
    ) -> Self {
        Self {
            tracker,
            entity,
            jid: jid.into(),
        }
    }
}

/// Result of running a pipeline transformation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// All records were transformed and loaded
    Ok,
    /// A transient condition; run the pipeline again after `delay`
    Retry { delay: Duration, reason: String },
    /// A terminal error reported by the pipeline itself
    Fatal { class: String, message: String },
}

impl PipelineOutcome {
    pub fn retry(delay: Duration, reason: impl Into<String>) -> Self {
        Self::Retry {
            delay,
            reason: reason.into(),
        }
    }

    pub fn fatal(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fatal {
            class: class.into(),
            message: message.into(),
        }
    }
}

/// A named unit of transformation registered with the coordinator
///
/// Implementations return `Err` only for unexpected errors; those go through the
/// runtime's retry budget before the tracker is failed.
#[async_trait]
pub trait Pipeline: Send + Sync {
    /// Identifier stored on the tracker (`pipeline_name`)
    fn name(&self) -> &str;

    /// Relation exported by the source instance for this pipeline
    fn relation(&self) -> &str;

    /// File-extraction pipelines read from a staged remote export and may be batched
    fn is_file_extraction(&self) -> bool {
        false
    }

    async fn run(&self, context: &PipelineContext) -> anyhow::Result<PipelineOutcome>;
}
