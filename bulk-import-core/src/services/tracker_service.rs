use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use tracing::debug;

use crate::database::entities::{
    bulk_import_entities, bulk_imports, pipeline_batches, pipeline_trackers, TrackerEvent,
    TrackerStatus,
};
use crate::errors::{CoordinatorError, CoordinatorResult};

/// Lookups and status transitions for trackers and their entities
///
/// This is the only writer of `pipeline_trackers.status`.
#[derive(Clone)]
pub struct TrackerService {
    db: DatabaseConnection,
}

/// A status change plus the bookkeeping written with it
#[derive(Debug, Clone)]
pub struct Transition<'a> {
    pub event: TrackerEvent,
    pub jid: Option<&'a str>,
    pub batched: Option<bool>,
}

impl<'a> Transition<'a> {
    pub fn new(event: TrackerEvent) -> Self {
        Self {
            event,
            jid: None,
            batched: None,
        }
    }

    pub fn jid(mut self, jid: &'a str) -> Self {
        self.jid = Some(jid);
        self
    }

    pub fn batched(mut self, batched: bool) -> Self {
        self.batched = Some(batched);
        self
    }
}

impl TrackerService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_entity(&self, id: i32) -> CoordinatorResult<bulk_import_entities::Model> {
        bulk_import_entities::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CoordinatorError::not_found("entity", id))
    }

    pub async fn find_tracker(&self, id: i32) -> CoordinatorResult<pipeline_trackers::Model> {
        pipeline_trackers::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CoordinatorError::not_found("tracker", id))
    }

    /// Source version of the import an entity belongs to, if known
    pub async fn source_version(
        &self,
        entity: &bulk_import_entities::Model,
    ) -> CoordinatorResult<Option<String>> {
        let bulk_import = bulk_imports::Entity::find_by_id(entity.bulk_import_id)
            .one(&self.db)
            .await?;
        Ok(bulk_import.and_then(|import| import.source_version))
    }

    /// Trackers of an entity in planner order
    pub async fn list_trackers(
        &self,
        entity_id: i32,
    ) -> CoordinatorResult<Vec<pipeline_trackers::Model>> {
        Ok(pipeline_trackers::Entity::find()
            .filter(pipeline_trackers::Column::EntityId.eq(entity_id))
            .order_by_asc(pipeline_trackers::Column::Stage)
            .order_by_asc(pipeline_trackers::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn list_batches(
        &self,
        tracker_id: i32,
    ) -> CoordinatorResult<Vec<pipeline_batches::Model>> {
        Ok(pipeline_batches::Entity::find()
            .filter(pipeline_batches::Column::TrackerId.eq(tracker_id))
            .order_by_asc(pipeline_batches::Column::BatchNumber)
            .all(&self.db)
            .await?)
    }

    /// Apply a status event to a tracker
    ///
    /// The update is conditional on the status the caller observed, so a concurrent
    /// writer cannot be silently overwritten. Re-applying an event whose result is
    /// already persisted succeeds without changes.
    pub async fn transition(
        &self,
        tracker: &pipeline_trackers::Model,
        transition: Transition<'_>,
    ) -> CoordinatorResult<pipeline_trackers::Model> {
        let current = Self::status_of(tracker)?;
        let next = current
            .apply(transition.event)
            .ok_or_else(|| CoordinatorError::InvalidTransition {
                from: current.as_str().to_string(),
                event: transition.event.as_str().to_string(),
            })?;

        let mut update = pipeline_trackers::Entity::update_many()
            .col_expr(pipeline_trackers::Column::Status, Expr::value(next.as_str()))
            .col_expr(pipeline_trackers::Column::UpdatedAt, Expr::value(Utc::now()));
        if let Some(jid) = transition.jid {
            update = update.col_expr(pipeline_trackers::Column::Jid, Expr::value(jid));
        }
        if let Some(batched) = transition.batched {
            update = update.col_expr(pipeline_trackers::Column::Batched, Expr::value(batched));
        }

        let result = update
            .filter(pipeline_trackers::Column::Id.eq(tracker.id))
            .filter(pipeline_trackers::Column::Status.eq(current.as_str()))
            .exec(&self.db)
            .await?;

        let updated = self.find_tracker(tracker.id).await?;

        if result.rows_affected == 0 {
            // Someone else moved the tracker; accept it only if it already reached `next`
            let observed = Self::status_of(&updated)?;
            if observed != next {
                return Err(CoordinatorError::InvalidTransition {
                    from: observed.as_str().to_string(),
                    event: transition.event.as_str().to_string(),
                });
            }
        }

        debug!(
            tracker_id = tracker.id,
            from = current.as_str(),
            to = next.as_str(),
            event = transition.event.as_str(),
            "Tracker transitioned"
        );

        Ok(updated)
    }

    fn status_of(tracker: &pipeline_trackers::Model) -> CoordinatorResult<TrackerStatus> {
        tracker
            .tracker_status()
            .ok_or_else(|| CoordinatorError::InvalidTransition {
                from: tracker.status.clone(),
                event: "read".to_string(),
            })
    }
}
