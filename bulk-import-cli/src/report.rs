use std::fmt::Write;

use anyhow::Result;
use bulk_import::database::entities::{
    bulk_import_entities, import_failures, pipeline_batches, pipeline_trackers,
};
use bulk_import::services::{FailureRecorder, LogErrorTracker, TrackerService};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct TrackerReport {
    pub tracker: pipeline_trackers::Model,
    pub batches: Vec<pipeline_batches::Model>,
}

/// Persisted progress of one entity
#[derive(Debug, Serialize)]
pub struct EntityReport {
    pub entity: bulk_import_entities::Model,
    pub trackers: Vec<TrackerReport>,
    pub failures: Vec<import_failures::Model>,
}

impl EntityReport {
    pub async fn load(db: DatabaseConnection, entity_id: i32) -> Result<Self> {
        let service = TrackerService::new(db.clone());
        let entity = service.find_entity(entity_id).await?;

        let mut trackers = Vec::new();
        for tracker in service.list_trackers(entity_id).await? {
            let batches = if tracker.batched {
                service.list_batches(tracker.id).await?
            } else {
                Vec::new()
            };
            trackers.push(TrackerReport { tracker, batches });
        }

        let failures = FailureRecorder::new(db, Arc::new(LogErrorTracker))
            .list_failures(entity_id)
            .await?;

        Ok(Self {
            entity,
            trackers,
            failures,
        })
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Entity {} ({}) {} [{}]",
            self.entity.id, self.entity.source_type, self.entity.source_full_path, self.entity.status
        );

        let _ = writeln!(out, "\nTrackers:");
        for TrackerReport { tracker, batches } in &self.trackers {
            let _ = writeln!(
                out,
                "  #{:<6} stage {:<3} {:<32} {:<9} jid={}{}",
                tracker.id,
                tracker.stage,
                tracker.pipeline_name,
                tracker.status,
                tracker.jid.as_deref().unwrap_or("-"),
                if tracker.batched { " batched" } else { "" }
            );
            for batch in batches {
                let _ = writeln!(
                    out,
                    "      batch {:<4} {}",
                    batch.batch_number, batch.status
                );
            }
        }

        if self.failures.is_empty() {
            let _ = writeln!(out, "\nNo failures");
        } else {
            let _ = writeln!(out, "\nFailures:");
            for failure in &self.failures {
                let _ = writeln!(
                    out,
                    "  {} {} {}: {} (correlation {})",
                    failure.created_at.format("%Y-%m-%d %H:%M:%S"),
                    failure.pipeline_class,
                    failure.exception_class,
                    failure.exception_message,
                    failure.correlation_id_value
                );
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::prelude::ChronoDateTimeUtc;

    fn now() -> ChronoDateTimeUtc {
        ChronoDateTimeUtc::default()
    }

    #[test]
    fn test_render_lists_batches_and_failures() {
        let report = EntityReport {
            entity: bulk_import_entities::Model {
                id: 3,
                bulk_import_id: 1,
                source_type: "project_entity".to_string(),
                source_full_path: "acme/widgets".to_string(),
                status: "started".to_string(),
                created_at: now(),
                updated_at: now(),
            },
            trackers: vec![TrackerReport {
                tracker: pipeline_trackers::Model {
                    id: 10,
                    entity_id: 3,
                    pipeline_name: "issues".to_string(),
                    stage: 1,
                    status: "started".to_string(),
                    batched: true,
                    jid: Some("abc".to_string()),
                    created_at: Some(now()),
                    updated_at: now(),
                },
                batches: vec![pipeline_batches::Model {
                    id: 1,
                    tracker_id: 10,
                    batch_number: 1,
                    status: "created".to_string(),
                    created_at: now(),
                    updated_at: now(),
                }],
            }],
            failures: vec![import_failures::Model {
                id: 1,
                entity_id: 3,
                pipeline_class: "labels".to_string(),
                pipeline_step: "pipeline_run".to_string(),
                exception_class: "PipelineFailedError".to_string(),
                exception_message: "disk full".to_string(),
                correlation_id_value: "corr".to_string(),
                created_at: now(),
            }],
        };

        let rendered = report.render();
        assert!(rendered.contains("acme/widgets"));
        assert!(rendered.contains("jid=abc batched"));
        assert!(rendered.contains("batch 1"));
        assert!(rendered.contains("PipelineFailedError: disk full"));
    }
}
