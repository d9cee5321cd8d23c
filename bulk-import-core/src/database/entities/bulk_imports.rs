use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One import job spanning many entities
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bulk_imports")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub source_url: String,
    pub source_version: Option<String>,
    pub status: String,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::bulk_import_entities::Entity")]
    Entities,
}

impl Related<super::bulk_import_entities::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Entities.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
