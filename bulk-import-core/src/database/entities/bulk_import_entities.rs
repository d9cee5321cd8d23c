use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One source-to-destination migration unit (a group or a project)
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bulk_import_entities")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub bulk_import_id: i32,
    pub source_type: String, // "group_entity" or "project_entity"
    pub source_full_path: String,
    pub status: String,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

impl Model {
    /// Set by a sibling subsystem once the entity can no longer be imported
    pub fn is_failed(&self) -> bool {
        EntityStatus::from_str(&self.status) == Some(EntityStatus::Failed)
    }

    /// Kind of object the entity's pipelines write into
    pub fn portable_type(&self) -> PortableType {
        match self.source_type.as_str() {
            "project_entity" => PortableType::Project,
            _ => PortableType::Group,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityStatus {
    Created,
    Started,
    Finished,
    Failed,
    Timeout,
}

impl EntityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityStatus::Created => "created",
            EntityStatus::Started => "started",
            EntityStatus::Finished => "finished",
            EntityStatus::Failed => "failed",
            EntityStatus::Timeout => "timeout",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "created" => Some(EntityStatus::Created),
            "started" => Some(EntityStatus::Started),
            "finished" => Some(EntityStatus::Finished),
            "failed" => Some(EntityStatus::Failed),
            "timeout" => Some(EntityStatus::Timeout),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortableType {
    Group,
    Project,
}

impl PortableType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortableType::Group => "group",
            PortableType::Project => "project",
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::bulk_imports::Entity",
        from = "Column::BulkImportId",
        to = "super::bulk_imports::Column::Id"
    )]
    BulkImports,
    #[sea_orm(has_many = "super::pipeline_trackers::Entity")]
    PipelineTrackers,
    #[sea_orm(has_many = "super::import_failures::Entity")]
    ImportFailures,
}

impl Related<super::bulk_imports::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BulkImports.def()
    }
}

impl Related<super::pipeline_trackers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PipelineTrackers.def()
    }
}

impl Related<super::import_failures::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ImportFailures.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
