use serde::Serialize;
use tracing::{error, info_span, Span};

use crate::database::entities::{bulk_import_entities, pipeline_trackers};

pub const IMPORTER_NAME: &str = "bulk_import";

/// Structured fields attached to every log line of a worker invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogAttributes {
    pub bulk_import_entity_id: i32,
    pub bulk_import_id: i32,
    pub bulk_import_entity_type: String,
    pub source_full_path: String,
    pub pipeline_tracker_id: i32,
    pub pipeline_class: String,
    pub pipeline_tracker_state: String,
    pub source_version: Option<String>,
    pub importer: &'static str,
}

impl LogAttributes {
    pub fn new(
        entity: &bulk_import_entities::Model,
        tracker: &pipeline_trackers::Model,
        source_version: Option<String>,
    ) -> Self {
        Self {
            bulk_import_entity_id: entity.id,
            bulk_import_id: entity.bulk_import_id,
            bulk_import_entity_type: entity.source_type.clone(),
            source_full_path: entity.source_full_path.clone(),
            pipeline_tracker_id: tracker.id,
            pipeline_class: tracker.pipeline_name.clone(),
            pipeline_tracker_state: tracker.status.clone(),
            source_version,
            importer: IMPORTER_NAME,
        }
    }

    /// Refresh the tracker state after a transition
    pub fn with_state(mut self, tracker: &pipeline_trackers::Model) -> Self {
        self.pipeline_tracker_state = tracker.status.clone();
        self
    }

    pub fn span(&self) -> Span {
        info_span!(
            "pipeline_worker",
            bulk_import_entity_id = self.bulk_import_entity_id,
            bulk_import_id = self.bulk_import_id,
            bulk_import_entity_type = %self.bulk_import_entity_type,
            source_full_path = %self.source_full_path,
            pipeline_tracker_id = self.pipeline_tracker_id,
            pipeline_class = %self.pipeline_class,
            pipeline_tracker_state = %self.pipeline_tracker_state,
            source_version = self.source_version.as_deref().unwrap_or("unknown"),
            importer = self.importer,
        )
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Refresh the state field of the current `pipeline_worker` span
pub fn record_tracker_state(tracker: &pipeline_trackers::Model) {
    Span::current().record("pipeline_tracker_state", tracker.status.as_str());
}

/// Log an error with its class alongside the invocation attributes
pub fn log_exception(attributes: &LogAttributes, class: &str, message: &str, summary: &str) {
    error!(
        pipeline_tracker_id = attributes.pipeline_tracker_id,
        pipeline_class = %attributes.pipeline_class,
        pipeline_tracker_state = %attributes.pipeline_tracker_state,
        exception_class = class,
        exception_message = message,
        "{}",
        summary
    );
}
