use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One numbered chunk of a batched export
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pipeline_batches")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub tracker_id: i32,
    pub batch_number: i32,
    pub status: String,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchStatus {
    Created,
    Started,
    Finished,
    Failed,
    Skipped,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Created => "created",
            BatchStatus::Started => "started",
            BatchStatus::Finished => "finished",
            BatchStatus::Failed => "failed",
            BatchStatus::Skipped => "skipped",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "created" => Some(BatchStatus::Created),
            "started" => Some(BatchStatus::Started),
            "finished" => Some(BatchStatus::Finished),
            "failed" => Some(BatchStatus::Failed),
            "skipped" => Some(BatchStatus::Skipped),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::pipeline_trackers::Entity",
        from = "Column::TrackerId",
        to = "super::pipeline_trackers::Column::Id"
    )]
    Trackers,
}

impl Related<super::pipeline_trackers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Trackers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
