use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::{debug, info};

use crate::common::db_errors::is_unique_violation;
use crate::database::entities::{pipeline_batches, pipeline_trackers, BatchStatus};
use crate::errors::{CoordinatorError, CoordinatorResult, PipelineError};
use crate::scheduler::Scheduler;

/// Splits a batched export into independently scheduled batch jobs
#[derive(Clone)]
pub struct BatchEnqueuer {
    db: DatabaseConnection,
    scheduler: Arc<dyn Scheduler>,
}

impl BatchEnqueuer {
    pub fn new(db: DatabaseConnection, scheduler: Arc<dyn Scheduler>) -> Self {
        Self { db, scheduler }
    }

    /// Find-or-create batches `1..=count` and schedule one job per batch
    ///
    /// Safe to re-run after a partial failure: existing rows are reused, so numbers
    /// are never duplicated or skipped. Completion is observed elsewhere.
    pub async fn enqueue_batches(
        &self,
        tracker: &pipeline_trackers::Model,
        count: u32,
    ) -> CoordinatorResult<Vec<pipeline_batches::Model>> {
        let last = i32::try_from(count).map_err(|_| {
            PipelineError::UpstreamFailed(format!("Batch count {} out of range", count))
        })?;
        let mut batches = Vec::new();

        for batch_number in 1..=last {
            let batch = self.find_or_create(tracker.id, batch_number).await?;
            self.scheduler
                .schedule_batch(batch.id)
                .await
                .map_err(CoordinatorError::Scheduling)?;
            debug!(tracker_id = tracker.id, batch_number, batch_id = batch.id, "Batch enqueued");
            batches.push(batch);
        }

        info!(tracker_id = tracker.id, batches = count, "Enqueued pipeline batches");
        Ok(batches)
    }

    async fn find_or_create(
        &self,
        tracker_id: i32,
        batch_number: i32,
    ) -> CoordinatorResult<pipeline_batches::Model> {
        if let Some(existing) = self.find(tracker_id, batch_number).await? {
            return Ok(existing);
        }

        let now = Utc::now();
        let batch = pipeline_batches::ActiveModel {
            tracker_id: Set(tracker_id),
            batch_number: Set(batch_number),
            status: Set(BatchStatus::Created.as_str().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        match batch.insert(&self.db).await {
            Ok(created) => Ok(created),
            // Another worker created it between our read and write
            Err(err) if is_unique_violation(&err) => self
                .find(tracker_id, batch_number)
                .await?
                .ok_or(CoordinatorError::Database(err)),
            Err(err) => Err(err.into()),
        }
    }

    async fn find(
        &self,
        tracker_id: i32,
        batch_number: i32,
    ) -> CoordinatorResult<Option<pipeline_batches::Model>> {
        Ok(pipeline_batches::Entity::find()
            .filter(pipeline_batches::Column::TrackerId.eq(tracker_id))
            .filter(pipeline_batches::Column::BatchNumber.eq(batch_number))
            .one(&self.db)
            .await?)
    }
}
