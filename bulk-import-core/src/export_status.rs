//! Remote export progress
//!
//! File-extraction pipelines read from an export the source instance prepares
//! asynchronously. This module turns one read of that export's status into an
//! [`ExportStatusSnapshot`], a small closed vocabulary the coordinator decides on.
//! The evaluator never retries: a failed read becomes a `failed` snapshot carrying
//! the read error.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::database::entities::{bulk_import_entities, pipeline_trackers};

/// Export state as reported by the source instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteExportState {
    Started,
    Finished,
    Failed,
}

/// Status of one relation's export
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationExportStatus {
    #[serde(default)]
    pub relation: Option<String>,
    #[serde(default)]
    pub status: Option<RemoteExportState>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub batched: bool,
    #[serde(default)]
    pub batches_count: i64,
}

/// Raw response of a status read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteExportPayload {
    /// Nothing exported yet
    Empty,
    /// Status of the requested relation only
    Single(RelationExportStatus),
    /// Statuses of every relation of the portable
    PerRelation(Vec<RelationExportStatus>),
}

impl RemoteExportPayload {
    /// Parse a JSON response body: `null`, one status object, or a list of them
    pub fn from_json(value: JsonValue) -> anyhow::Result<Self> {
        match value {
            JsonValue::Null => Ok(Self::Empty),
            JsonValue::Array(_) => Ok(Self::PerRelation(serde_json::from_value(value)?)),
            JsonValue::Object(_) => Ok(Self::Single(serde_json::from_value(value)?)),
            other => Err(anyhow::anyhow!(
                "Unexpected export status payload: {}",
                other
            )),
        }
    }

    fn into_relation(self, relation: &str) -> Option<RelationExportStatus> {
        match self {
            Self::Empty => None,
            Self::Single(status) => Some(status),
            Self::PerRelation(statuses) => statuses
                .into_iter()
                .find(|status| status.relation.as_deref() == Some(relation)),
        }
    }
}

/// Reads export progress from the source instance
#[async_trait]
pub trait ExportStatusClient: Send + Sync {
    async fn fetch_status(
        &self,
        tracker: &pipeline_trackers::Model,
        entity: &bulk_import_entities::Model,
        relation: &str,
    ) -> anyhow::Result<RemoteExportPayload>;
}

/// Point-in-time view of a remote export
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportStatusSnapshot {
    pub empty: bool,
    pub started: bool,
    pub failed: bool,
    pub batched: bool,
    pub batches_count: u32,
    pub error: Option<String>,
}

impl ExportStatusSnapshot {
    /// Export finished and not batched
    pub fn ready() -> Self {
        Self::default()
    }

    pub fn empty() -> Self {
        Self {
            empty: true,
            ..Self::default()
        }
    }

    pub fn started() -> Self {
        Self {
            started: true,
            ..Self::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            failed: true,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn batched(batches_count: u32) -> Self {
        Self {
            batched: true,
            batches_count,
            ..Self::default()
        }
    }

    /// The source has not finished preparing data
    pub fn is_pending(&self) -> bool {
        self.empty || self.started
    }

    pub fn from_relation_status(status: Option<RelationExportStatus>) -> Self {
        let Some(status) = status else {
            return Self::empty();
        };

        // Batch numbers are stored as i32
        let batches_count = match i32::try_from(status.batches_count) {
            Ok(count) if count >= 0 => count as u32,
            _ => {
                return Self::failed(format!(
                    "Invalid batches_count {} in export status",
                    status.batches_count
                ))
            }
        };

        let state = status.status;
        Self {
            empty: state.is_none(),
            started: state == Some(RemoteExportState::Started),
            failed: state == Some(RemoteExportState::Failed),
            batched: status.batched,
            batches_count,
            error: status.error,
        }
    }
}

/// Wraps a status read into an [`ExportStatusSnapshot`]
#[derive(Clone)]
pub struct ExportStatusEvaluator {
    client: Arc<dyn ExportStatusClient>,
}

impl ExportStatusEvaluator {
    pub fn new(client: Arc<dyn ExportStatusClient>) -> Self {
        Self { client }
    }

    pub async fn evaluate(
        &self,
        tracker: &pipeline_trackers::Model,
        entity: &bulk_import_entities::Model,
        relation: &str,
    ) -> ExportStatusSnapshot {
        match self.client.fetch_status(tracker, entity, relation).await {
            Ok(payload) => {
                let snapshot =
                    ExportStatusSnapshot::from_relation_status(payload.into_relation(relation));
                debug!(
                    tracker_id = tracker.id,
                    relation,
                    empty = snapshot.empty,
                    started = snapshot.started,
                    failed = snapshot.failed,
                    batched = snapshot.batched,
                    batches_count = snapshot.batches_count,
                    "Export status evaluated"
                );
                snapshot
            }
            Err(err) => {
                warn!(
                    tracker_id = tracker.id,
                    relation,
                    error = %err,
                    "Failed to read export status"
                );
                ExportStatusSnapshot::failed(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    struct StaticClient(anyhow::Result<JsonValue>);

    #[async_trait]
    impl ExportStatusClient for StaticClient {
        async fn fetch_status(
            &self,
            _tracker: &pipeline_trackers::Model,
            _entity: &bulk_import_entities::Model,
            _relation: &str,
        ) -> anyhow::Result<RemoteExportPayload> {
            match &self.0 {
                Ok(value) => RemoteExportPayload::from_json(value.clone()),
                Err(err) => Err(anyhow::anyhow!("{}", err)),
            }
        }
    }

    fn tracker() -> pipeline_trackers::Model {
        pipeline_trackers::Model {
            id: 1,
            entity_id: 1,
            pipeline_name: "issues".to_string(),
            stage: 1,
            status: "enqueued".to_string(),
            batched: false,
            jid: None,
            created_at: Some(Utc::now()),
            updated_at: Utc::now(),
        }
    }

    fn entity() -> bulk_import_entities::Model {
        bulk_import_entities::Model {
            id: 1,
            bulk_import_id: 1,
            source_type: "project_entity".to_string(),
            source_full_path: "acme/widgets".to_string(),
            status: "started".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    async fn evaluate(response: anyhow::Result<JsonValue>) -> ExportStatusSnapshot {
        let evaluator = ExportStatusEvaluator::new(Arc::new(StaticClient(response)));
        evaluator.evaluate(&tracker(), &entity(), "issues").await
    }

    #[tokio::test]
    async fn test_null_payload_is_empty() {
        let snapshot = evaluate(Ok(JsonValue::Null)).await;
        assert!(snapshot.empty);
        assert!(snapshot.is_pending());
    }

    #[tokio::test]
    async fn test_started_export() {
        let snapshot = evaluate(Ok(json!({"status": "started"}))).await;
        assert!(snapshot.started);
        assert!(!snapshot.empty);
        assert!(snapshot.is_pending());
    }

    #[tokio::test]
    async fn test_batched_relation_picked_from_list() {
        let snapshot = evaluate(Ok(json!([
            {"relation": "labels", "status": "finished"},
            {"relation": "issues", "status": "finished", "batched": true, "batches_count": 4}
        ])))
        .await;

        assert!(!snapshot.is_pending());
        assert!(snapshot.batched);
        assert_eq!(snapshot.batches_count, 4);
    }

    #[tokio::test]
    async fn test_missing_relation_in_list_is_empty() {
        let snapshot = evaluate(Ok(json!([{"relation": "labels", "status": "finished"}]))).await;
        assert!(snapshot.empty);
    }

    #[tokio::test]
    async fn test_failed_export_keeps_error() {
        let snapshot = evaluate(Ok(json!({"status": "failed", "error": "disk full"}))).await;
        assert!(snapshot.failed);
        assert_eq!(snapshot.error.as_deref(), Some("disk full"));
    }

    #[tokio::test]
    async fn test_read_error_becomes_failed_snapshot() {
        let snapshot = evaluate(Err(anyhow::anyhow!("connection refused"))).await;
        assert!(snapshot.failed);
        assert_eq!(snapshot.error.as_deref(), Some("connection refused"));
    }

    #[tokio::test]
    async fn test_out_of_range_batches_count_fails() {
        let snapshot = evaluate(Ok(json!({
            "status": "finished",
            "batched": true,
            "batches_count": 2_147_483_648_i64
        })))
        .await;
        assert!(snapshot.failed);
        assert_eq!(snapshot.batches_count, 0);
        assert!(snapshot.error.unwrap().contains("2147483648"));

        let snapshot = evaluate(Ok(json!({"status": "finished", "batches_count": -1}))).await;
        assert!(snapshot.failed);
    }

    #[test]
    fn test_scalar_payload_is_rejected() {
        assert!(RemoteExportPayload::from_json(json!(42)).is_err());
    }
}
