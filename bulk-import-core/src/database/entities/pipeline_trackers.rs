use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::tracker_status::TrackerStatus;

/// One attempt to run one pipeline for one entity
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pipeline_trackers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub entity_id: i32,
    pub pipeline_name: String,
    pub stage: i32,
    pub status: String,
    pub batched: bool,
    pub jid: Option<String>,
    // Rows written before the column existed have no creation time
    pub created_at: Option<ChronoDateTimeUtc>,
    pub updated_at: ChronoDateTimeUtc,
}

impl Model {
    pub fn tracker_status(&self) -> Option<TrackerStatus> {
        TrackerStatus::from_str(&self.status)
    }

    /// Only enqueued or started trackers may run the decision algorithm
    pub fn is_runnable(&self) -> bool {
        matches!(
            self.tracker_status(),
            Some(TrackerStatus::Enqueued) | Some(TrackerStatus::Started)
        )
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::bulk_import_entities::Entity",
        from = "Column::EntityId",
        to = "super::bulk_import_entities::Column::Id"
    )]
    Entities,
    #[sea_orm(has_many = "super::pipeline_batches::Entity")]
    Batches,
}

impl Related<super::bulk_import_entities::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Entities.def()
    }
}

impl Related<super::pipeline_batches::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Batches.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
