use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::error;

use super::tracker_service::{TrackerService, Transition};
use crate::database::entities::{
    bulk_import_entities, import_failures, pipeline_trackers, TrackerEvent,
};
use crate::errors::{CoordinatorError, CoordinatorResult, PipelineError};
use crate::logging::{log_exception, LogAttributes};

pub const PIPELINE_STEP: &str = "pipeline_run";

/// Class and message of the error that ended a pipeline attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    pub exception_class: String,
    pub message: String,
}

impl FailureReport {
    pub fn new(exception_class: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            exception_class: exception_class.into(),
            message: message.into(),
        }
    }
}

impl From<&PipelineError> for FailureReport {
    fn from(err: &PipelineError) -> Self {
        Self::new(err.exception_class(), err.to_string())
    }
}

impl From<&CoordinatorError> for FailureReport {
    fn from(err: &CoordinatorError) -> Self {
        Self::new(err.exception_class(), err.to_string())
    }
}

/// External error-tracking sink
#[async_trait]
pub trait ErrorTracker: Send + Sync {
    async fn track(&self, report: &FailureReport, attributes: &LogAttributes);
}

/// Error tracker that only writes to the log
#[derive(Debug, Default, Clone)]
pub struct LogErrorTracker;

#[async_trait]
impl ErrorTracker for LogErrorTracker {
    async fn track(&self, report: &FailureReport, attributes: &LogAttributes) {
        error!(
            exception_class = %report.exception_class,
            exception_message = %report.message,
            attributes = %attributes.to_json(),
            "Tracked pipeline exception"
        );
    }
}

/// Fails trackers and keeps the append-only failure log
#[derive(Clone)]
pub struct FailureRecorder {
    db: DatabaseConnection,
    trackers: TrackerService,
    error_tracker: Arc<dyn ErrorTracker>,
}

impl FailureRecorder {
    pub fn new(db: DatabaseConnection, error_tracker: Arc<dyn ErrorTracker>) -> Self {
        Self {
            trackers: TrackerService::new(db.clone()),
            db,
            error_tracker,
        }
    }

    /// Move the tracker to `failed`, log and track the error, and append a failure row
    pub async fn fail_tracker(
        &self,
        tracker: &pipeline_trackers::Model,
        entity: &bulk_import_entities::Model,
        report: &FailureReport,
        attributes: &LogAttributes,
        jid: &str,
        correlation_id: Option<&str>,
    ) -> CoordinatorResult<import_failures::Model> {
        let failed = self
            .trackers
            .transition(tracker, Transition::new(TrackerEvent::FailOp).jid(jid))
            .await?;
        let attributes = attributes.clone().with_state(&failed);

        log_exception(
            &attributes,
            &report.exception_class,
            &report.message,
            "Pipeline failed",
        );

        self.error_tracker.track(report, &attributes).await;

        let correlation_id = correlation_id
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let failure = import_failures::ActiveModel {
            entity_id: Set(entity.id),
            pipeline_class: Set(tracker.pipeline_name.clone()),
            pipeline_step: Set(PIPELINE_STEP.to_string()),
            exception_class: Set(report.exception_class.clone()),
            exception_message: Set(report.message.clone()),
            correlation_id_value: Set(correlation_id),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        Ok(failure.insert(&self.db).await?)
    }

    pub async fn list_failures(
        &self,
        entity_id: i32,
    ) -> CoordinatorResult<Vec<import_failures::Model>> {
        Ok(import_failures::Entity::find()
            .filter(import_failures::Column::EntityId.eq(entity_id))
            .order_by_asc(import_failures::Column::CreatedAt)
            .order_by_asc(import_failures::Column::Id)
            .all(&self.db)
            .await?)
    }
}
