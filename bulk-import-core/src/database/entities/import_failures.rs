use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Append-only record of one pipeline failure
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "import_failures")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub entity_id: i32,
    pub pipeline_class: String,
    pub pipeline_step: String,
    pub exception_class: String,
    pub exception_message: String,
    pub correlation_id_value: String,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::bulk_import_entities::Entity",
        from = "Column::EntityId",
        to = "super::bulk_import_entities::Column::Id"
    )]
    Entities,
}

impl Related<super::bulk_import_entities::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Entities.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
